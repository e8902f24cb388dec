use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;

use crate::api::types::ScanErrorBody;
use crate::config::ClientConfig;
use crate::error::{DecodeError, TransportError};
use crate::scanner;
use crate::scanner::types::ScanResponse;

/// The seam between the session manager and whatever carries the scan
/// request. Production uses [`ScanClient`]; tests substitute a mock.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScanTransport: Send + Sync {
    async fn request_scan(&self) -> Result<ScanResponse, TransportError>;
}

/// HTTP facade over the orchestration service.
pub struct ScanClient {
    client: Client,
    base_url: String,
}

impl ScanClient {
    pub fn new(config: ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub async fn health_check(&self) -> Result<bool, TransportError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_request_error)?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl ScanTransport for ScanClient {
    async fn request_scan(&self) -> Result<ScanResponse, TransportError> {
        let url = format!("{}/api/scan", self.base_url);
        log::info!("requesting scan from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_request_error)?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<ScanErrorBody>(&body)
                .unwrap_or_else(|_| ScanErrorBody::new(format!("HTTP {}", status), body.clone()));
            log::error!(
                "scan service returned {}: {} ({})",
                status,
                parsed.error,
                parsed.details
            );
            return Err(TransportError::ServerError {
                status: status.as_u16(),
                body: parsed,
            });
        }

        match scanner::decode(body.as_bytes()) {
            Ok(result) => {
                log::info!("scan returned {} device(s)", result.devices.len());
                Ok(result)
            }
            Err(DecodeError::MalformedPayload { raw_text, cause }) => {
                log::error!("scan service returned an undecodable body: {}", cause);
                Err(TransportError::ServerError {
                    status: status.as_u16(),
                    body: ScanErrorBody::new("Invalid scan response", cause).with_raw(raw_text),
                })
            }
        }
    }
}

fn map_request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut
    } else {
        TransportError::Unreachable {
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::config::ScannerConfig;
    use crate::server::{routes, ScanService};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    async fn serve_script(dir: &TempDir, body: &str, scan_timeout: Duration) -> SocketAddr {
        let path = dir.path().join("fake_scan.sh");
        std::fs::write(&path, body).unwrap();
        let mut config = ScannerConfig::new(dir.path());
        config.script_path = path;
        config.interpreter = "/bin/sh".to_string();

        let service = Arc::new(ScanService::new(config, scan_timeout));
        let (addr, server) = warp::serve(routes(service)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    fn client_for(addr: SocketAddr, request_timeout: Duration) -> ScanClient {
        let url = Url::parse(&format!("http://{}", addr)).unwrap();
        ScanClient::new(ClientConfig {
            base_url: url,
            request_timeout,
        })
    }

    #[tokio::test]
    async fn end_to_end_scan_decodes_devices() {
        let dir = tempfile::tempdir().unwrap();
        let addr = serve_script(
            &dir,
            "echo '{\"interface\":\"eth0\",\"myip\":\"192.168.1.5\",\"network\":\"192.168.1.0/24\",\"devices\":[{\"ip\":\"192.168.1.10\",\"mac\":\"AA:BB:CC:DD:EE:FF\",\"open_ports\":[22,80]}]}'\n",
            Duration::from_secs(30),
        )
        .await;

        let client = client_for(addr, Duration::from_secs(10));
        assert!(client.health_check().await.unwrap());

        let result = client.request_scan().await.unwrap();
        assert_eq!(result.interface.as_deref(), Some("eth0"));
        assert_eq!(result.devices.len(), 1);
        assert_eq!(result.devices[0].open_ports, vec![22, 80]);
    }

    #[tokio::test]
    async fn server_failure_surfaces_the_error_document() {
        let dir = tempfile::tempdir().unwrap();
        let addr = serve_script(
            &dir,
            "echo 'permission denied' >&2\nexit 1\n",
            Duration::from_secs(30),
        )
        .await;

        let client = client_for(addr, Duration::from_secs(10));
        let err = client.request_scan().await.unwrap_err();
        match err {
            TransportError::ServerError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.error, "Scan failed");
                assert_eq!(body.stderr.as_deref().map(str::trim), Some("permission denied"));
            }
            other => panic!("expected ServerError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        // Bind then drop to get a port nothing is listening on.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = client_for(addr, Duration::from_secs(5));
        let err = client.request_scan().await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn deadline_elapsing_is_timed_out() {
        let dir = tempfile::tempdir().unwrap();
        let addr = serve_script(
            &dir,
            "sleep 30\necho '{\"devices\":[]}'\n",
            Duration::from_secs(60),
        )
        .await;

        let client = client_for(addr, Duration::from_millis(200));
        let err = client.request_scan().await.unwrap_err();
        assert!(matches!(err, TransportError::TimedOut));
    }
}
