use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::types::ScanErrorBody;

/// Failures launching or supervising the external scanner process.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    #[error("scanner script not found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to start scanner process: {detail}")]
    SpawnFailed { detail: String },

    /// Nonzero exit. Both captured streams are kept verbatim.
    #[error("scanner exited with code {code}")]
    NonZeroExit {
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// Exit code 0 but nothing on stdout. A silent scanner is a failure,
    /// not an empty inventory.
    #[error("scanner produced no output")]
    EmptyOutput { stderr: String },
}

/// Failures turning raw scanner stdout into a typed inventory.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The original text is always retained for display and logging.
    #[error("malformed scan payload: {cause}")]
    MalformedPayload { raw_text: String, cause: String },
}

/// Failures on the caller side of the remote scan endpoint.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("scan service unreachable: {detail}")]
    Unreachable { detail: String },

    #[error("scan request timed out")]
    TimedOut,

    /// The service answered with a structured error document.
    #[error("scan service reported an error (status {status})")]
    ServerError { status: u16, body: ScanErrorBody },
}

/// Service-side aggregation of everything that can go wrong while
/// handling one scan request.
#[derive(Debug, Error)]
pub enum ScanServiceError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("scan timed out after {after:?}")]
    TimedOut { after: Duration },
}

/// Terminal failure of a scan session: a short user-facing summary plus
/// the full transport diagnostics for logging and inspection.
#[derive(Debug, Clone, Error)]
#[error("{summary}")]
pub struct ScanError {
    summary: String,
    transport: TransportError,
}

impl ScanError {
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn transport(&self) -> &TransportError {
        &self.transport
    }
}

impl From<TransportError> for ScanError {
    fn from(err: TransportError) -> Self {
        let summary = match &err {
            TransportError::Unreachable { detail } => {
                format!("Failed to connect to scan service: {}", detail)
            }
            TransportError::TimedOut => {
                "Scan request timed out. The scan may be taking longer than expected.".to_string()
            }
            TransportError::ServerError { body, .. } => {
                if body.details.is_empty() {
                    body.error.clone()
                } else {
                    format!("{}: {}", body.error, body.details)
                }
            }
        };
        Self {
            summary,
            transport: err,
        }
    }
}
