use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::api::types::ScanErrorBody;
use crate::config::{ScannerConfig, ServiceConfig};
use crate::error::{DecodeError, ProcessError, ScanServiceError};
use crate::scanner::types::ScanResponse;
use crate::scanner::{self, ScannerProcess};

/// Runs one scan per request: spawn the scanner, decode its output,
/// bounded by a service-side ceiling so a wedged scanner cannot hold a
/// request open forever.
pub struct ScanService {
    scanner: ScannerProcess,
    scan_timeout: Duration,
}

impl ScanService {
    pub fn new(scanner_config: ScannerConfig, scan_timeout: Duration) -> Self {
        Self {
            scanner: ScannerProcess::new(scanner_config),
            scan_timeout,
        }
    }

    pub async fn run_scan(&self) -> Result<ScanResponse, ScanServiceError> {
        // Dropping the timed-out future kills the child (kill_on_drop).
        let raw = tokio::time::timeout(self.scan_timeout, self.scanner.run())
            .await
            .map_err(|_| ScanServiceError::TimedOut {
                after: self.scan_timeout,
            })??;

        let result = scanner::decode(&raw.stdout)?;
        log::info!("scan finished: {} device(s)", result.devices.len());
        Ok(result)
    }
}

pub fn routes(
    service: Arc<ScanService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let scan = warp::path!("api" / "scan")
        .and(warp::get())
        .and(with_service(service))
        .and_then(handle_scan);

    let health = warp::path!("health").and(warp::get()).map(|| "OK");

    scan.or(health)
}

pub async fn serve(config: ServiceConfig, scanner_config: ScannerConfig) {
    let service = Arc::new(ScanService::new(scanner_config, config.scan_timeout));
    log::info!("lanscand listening on {}", config.bind_addr);
    warp::serve(routes(service)).run(config.bind_addr).await;
}

fn with_service(
    service: Arc<ScanService>,
) -> impl Filter<Extract = (Arc<ScanService>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&service))
}

async fn handle_scan(service: Arc<ScanService>) -> Result<impl Reply, Infallible> {
    match service.run_scan().await {
        Ok(result) => Ok(warp::reply::with_status(
            warp::reply::json(&result),
            StatusCode::OK,
        )),
        Err(err) => {
            log::error!("scan request failed: {}", err);
            let (status, body) = error_reply(&err);
            Ok(warp::reply::with_status(warp::reply::json(&body), status))
        }
    }
}

fn error_reply(err: &ScanServiceError) -> (StatusCode, ScanErrorBody) {
    match err {
        ScanServiceError::Process(err) => {
            (StatusCode::INTERNAL_SERVER_ERROR, process_error_body(err))
        }
        ScanServiceError::Decode(DecodeError::MalformedPayload { raw_text, cause }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ScanErrorBody::new("Parse error", cause.clone()).with_raw(raw_text.clone()),
        ),
        ScanServiceError::TimedOut { after } => (
            StatusCode::GATEWAY_TIMEOUT,
            ScanErrorBody::new(
                "Scan timed out",
                format!("no result after {} seconds", after.as_secs()),
            ),
        ),
    }
}

fn process_error_body(err: &ProcessError) -> ScanErrorBody {
    match err {
        ProcessError::NotFound { path } => ScanErrorBody::new(
            "Scanner not found",
            format!("missing script: {}", path.display()),
        ),
        ProcessError::SpawnFailed { detail } => {
            ScanErrorBody::new("Failed to start scan", detail.clone())
        }
        ProcessError::NonZeroExit {
            code,
            stdout,
            stderr,
        } => ScanErrorBody::new("Scan failed", format!("scanner exited with code {}", code))
            .with_stderr(stderr.clone())
            .with_stdout(stdout.clone()),
        ProcessError::EmptyOutput { stderr } => {
            ScanErrorBody::new("Scan produced no output", "scanner stdout was empty")
                .with_stderr(stderr.clone())
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service_with_script(dir: &TempDir, body: &str, scan_timeout: Duration) -> Arc<ScanService> {
        let path = dir.path().join("fake_scan.sh");
        std::fs::write(&path, body).unwrap();
        let mut config = ScannerConfig::new(dir.path());
        config.script_path = path;
        config.interpreter = "/bin/sh".to_string();
        Arc::new(ScanService::new(config, scan_timeout))
    }

    #[tokio::test]
    async fn scan_route_returns_the_decoded_document() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_script(
            &dir,
            "echo '{\"interface\":\"eth0\",\"myip\":\"192.168.1.5\",\"network\":\"192.168.1.0/24\",\"devices\":[{\"ip\":\"192.168.1.10\",\"mac\":\"AA:BB:CC:DD:EE:FF\",\"name\":\"\",\"vendor\":\"Apple\",\"open_ports\":[22,80],\"guessed_type\":\"laptop\"}]}'\n",
            Duration::from_secs(30),
        );

        let response = warp::test::request()
            .method("GET")
            .path("/api/scan")
            .reply(&routes(service))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let result: ScanResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(result.my_ip.as_deref(), Some("192.168.1.5"));
        assert_eq!(result.devices.len(), 1);
        assert_eq!(result.devices[0].vendor.as_deref(), Some("Apple"));
    }

    #[tokio::test]
    async fn process_failure_maps_to_the_error_document() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_script(
            &dir,
            "echo 'half a result'\necho 'permission denied' >&2\nexit 1\n",
            Duration::from_secs(30),
        );

        let response = warp::test::request()
            .method("GET")
            .path("/api/scan")
            .reply(&routes(service))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ScanErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.error, "Scan failed");
        assert_eq!(body.details, "scanner exited with code 1");
        assert_eq!(body.stderr.as_deref().map(str::trim), Some("permission denied"));
        assert_eq!(body.stdout.as_deref().map(str::trim), Some("half a result"));
    }

    #[tokio::test]
    async fn undecodable_output_maps_to_parse_error_with_raw() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            service_with_script(&dir, "echo 'Traceback: scapy missing'\n", Duration::from_secs(30));

        let response = warp::test::request()
            .method("GET")
            .path("/api/scan")
            .reply(&routes(service))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ScanErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.error, "Parse error");
        assert_eq!(body.raw.as_deref().map(str::trim), Some("Traceback: scapy missing"));
    }

    #[tokio::test]
    async fn wedged_scanner_hits_the_service_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_script(
            &dir,
            "sleep 30\necho '{\"devices\":[]}'\n",
            Duration::from_millis(200),
        );

        let response = warp::test::request()
            .method("GET")
            .path("/api/scan")
            .reply(&routes(service))
            .await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body: ScanErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.error, "Scan timed out");
    }

    #[tokio::test]
    async fn health_route_answers_ok() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with_script(&dir, "exit 0\n", Duration::from_secs(30));

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes(service))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "OK");
    }
}
