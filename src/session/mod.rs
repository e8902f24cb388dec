use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::client::ScanTransport;
use crate::error::ScanError;
use crate::scanner::types::{Device, ScanResponse};

pub const STATUS_READY: &str = "Ready to scan";
pub const STATUS_SCANNING: &str = "Scanning network... This may take a minute.";
pub const STATUS_CANCELLED: &str = "Scan was cancelled.";
pub const STATUS_NO_DEVICES: &str = "Scan complete. No devices found.";

#[derive(Debug, Clone)]
pub enum ScanState {
    Idle,
    Running,
    Succeeded(ScanResponse),
    Failed(ScanError),
    Cancelled,
}

impl ScanState {
    pub fn is_running(&self) -> bool {
        matches!(self, ScanState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Succeeded(_) | ScanState::Failed(_) | ScanState::Cancelled
        )
    }
}

/// The observable value of one scan session. The session manager is the
/// only writer; callers read snapshots or subscribe for changes.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub generation: u64,
    pub state: ScanState,
    pub status_message: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanSnapshot {
    fn idle() -> Self {
        Self {
            generation: 0,
            state: ScanState::Idle,
            status_message: STATUS_READY.to_string(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn devices(&self) -> &[Device] {
        match &self.state {
            ScanState::Succeeded(result) => &result.devices,
            _ => &[],
        }
    }
}

struct SessionInner {
    // Monotonically increasing; a completion whose generation is not
    // current must never touch visible state.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Single-flight, cancellable scan lifecycle. Issuing a new scan cancels
/// any in-flight one; at most one attempt is ever live.
pub struct ScanSessionManager {
    transport: Arc<dyn ScanTransport>,
    inner: Mutex<SessionInner>,
    tx: watch::Sender<ScanSnapshot>,
}

impl ScanSessionManager {
    pub fn new(transport: Arc<dyn ScanTransport>) -> Arc<Self> {
        let (tx, _rx) = watch::channel(ScanSnapshot::idle());
        Arc::new(Self {
            transport,
            inner: Mutex::new(SessionInner {
                generation: 0,
                task: None,
            }),
            tx,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.tx.borrow().clone()
    }

    /// Fire-and-forget; progress is observed through the snapshot, not a
    /// return value. Must be called from within a tokio runtime.
    pub fn start_scan(self: &Arc<Self>) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(task) = inner.task.take() {
            task.abort();
            let superseded = self.tx.borrow().clone();
            if superseded.state.is_running() {
                log::info!("superseding in-flight scan (generation {})", superseded.generation);
                self.tx.send_replace(ScanSnapshot {
                    state: ScanState::Cancelled,
                    status_message: STATUS_CANCELLED.to_string(),
                    finished_at: Some(Utc::now()),
                    ..superseded
                });
            }
        }

        inner.generation += 1;
        let generation = inner.generation;
        log::info!("starting scan (generation {})", generation);

        // Fresh snapshot: the previous inventory is cleared here.
        self.tx.send_replace(ScanSnapshot {
            generation,
            state: ScanState::Running,
            status_message: STATUS_SCANNING.to_string(),
            started_at: Some(Utc::now()),
            finished_at: None,
        });

        let manager = Arc::clone(self);
        inner.task = Some(tokio::spawn(async move {
            let result = manager.transport.request_scan().await;
            manager.complete(generation, result);
        }));
    }

    /// Idempotent; a no-op when nothing is in flight.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        let Some(task) = inner.task.take() else {
            return;
        };
        task.abort();
        // Invalidate the aborted attempt in case it already resolved and
        // is waiting to report its completion.
        inner.generation += 1;

        let current = self.tx.borrow().clone();
        if current.state.is_running() {
            log::info!("scan cancelled (generation {})", current.generation);
            self.tx.send_replace(ScanSnapshot {
                state: ScanState::Cancelled,
                status_message: STATUS_CANCELLED.to_string(),
                finished_at: Some(Utc::now()),
                ..current
            });
        }
    }

    fn complete(
        &self,
        generation: u64,
        result: Result<ScanResponse, crate::error::TransportError>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        if generation != inner.generation {
            log::debug!("discarding stale scan completion (generation {})", generation);
            return;
        }
        inner.task = None;

        let current = self.tx.borrow().clone();
        let snapshot = match result {
            Ok(result) => {
                let status = if result.devices.is_empty() {
                    STATUS_NO_DEVICES.to_string()
                } else {
                    format!("Scan complete. Found {} device(s).", result.devices.len())
                };
                log::info!("{}", status);
                ScanSnapshot {
                    state: ScanState::Succeeded(result),
                    status_message: status,
                    finished_at: Some(Utc::now()),
                    ..current
                }
            }
            Err(err) => {
                let err = ScanError::from(err);
                log::error!("scan failed: {}", err.summary());
                log::debug!("scan failure detail: {:?}", err.transport());
                let status = format!("Error: {}", err.summary());
                ScanSnapshot {
                    state: ScanState::Failed(err),
                    status_message: status,
                    finished_at: Some(Utc::now()),
                    ..current
                }
            }
        };
        self.tx.send_replace(snapshot);
    }
}
