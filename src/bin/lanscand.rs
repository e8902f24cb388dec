// lanscand: the scan orchestration service. Hosts the scan endpoint and
// runs the external scanner on request.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use lanscan::config::{ScannerConfig, ServiceConfig};
use lanscan::server;

#[tokio::main]
async fn main() -> Result<()> {
    lanscan::logging::init()?;

    let service_config = ServiceConfig::from_env()?;
    let scanner_config = ScannerConfig::from_env(scan_root()?);
    log::info!(
        "using scanner script {}",
        scanner_config.script_path.display()
    );

    server::serve(service_config, scanner_config).await;
    Ok(())
}

// The scanner resolves its own resources relative to the install root, so
// the root is pinned here rather than trusting whatever directory the
// daemon happened to be launched from.
fn scan_root() -> Result<PathBuf> {
    if let Ok(root) = env::var("LANSCAN_SCAN_ROOT") {
        return Ok(PathBuf::from(root));
    }
    let exe = env::current_exe().context("cannot resolve the daemon's executable path")?;
    Ok(exe
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".")))
}
