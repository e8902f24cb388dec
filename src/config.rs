use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

// Defaults mirror the service's historical localhost deployment.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5267";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5267";

/// Client-side deadline. Scans are slow (a full address range is probed),
/// so this is minutes, not seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Service-side ceiling on a single scanner run.
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 600;

/// Script location relative to the install root. The scanner resolves its
/// own resources from this root, so the working directory must match.
pub const SCRIPT_RELATIVE_PATH: &str = "scan_scripts/arp_scan.py";

pub fn default_interpreter() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// Everything the process adapter needs, passed explicitly so the adapter
/// never has to guess at its environment.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub script_path: PathBuf,
    pub working_dir: PathBuf,
    pub interpreter: String,
}

impl ScannerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            script_path: root.join(SCRIPT_RELATIVE_PATH),
            working_dir: root,
            interpreter: default_interpreter().to_string(),
        }
    }

    /// Root-based defaults with environment overrides.
    pub fn from_env(root: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(root);
        if let Ok(script) = env::var("LANSCAN_SCRIPT") {
            config.script_path = PathBuf::from(script);
        }
        if let Ok(interpreter) = env::var("LANSCAN_INTERPRETER") {
            config.interpreter = interpreter;
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub scan_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = match env::var("LANSCAN_BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid LANSCAN_BIND_ADDR: {}", raw))?,
            Err(_) => DEFAULT_BIND_ADDR.parse().expect("default bind addr is valid"),
        };
        let scan_timeout =
            env_duration_secs("LANSCAN_SCAN_TIMEOUT_SECS", DEFAULT_SCAN_TIMEOUT_SECS)?;
        Ok(Self {
            bind_addr,
            scan_timeout,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self> {
        let base_url = match env::var("LANSCAN_SERVER_URL") {
            Ok(raw) => {
                Url::parse(&raw).with_context(|| format!("invalid LANSCAN_SERVER_URL: {}", raw))?
            }
            Err(_) => Url::parse(DEFAULT_SERVER_URL).expect("default server url is valid"),
        };
        let request_timeout =
            env_duration_secs("LANSCAN_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        Ok(Self {
            base_url,
            request_timeout,
        })
    }
}

fn env_duration_secs(key: &str, default_secs: u64) -> Result<Duration> {
    let secs = match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid {}: {}", key, raw))?,
        Err(_) => default_secs,
    };
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_config_resolves_script_under_root() {
        let config = ScannerConfig::new("/opt/lanscan");
        assert_eq!(
            config.script_path,
            PathBuf::from("/opt/lanscan/scan_scripts/arp_scan.py")
        );
        assert_eq!(config.working_dir, PathBuf::from("/opt/lanscan"));
    }
}
