// lanscan: headless caller for the scan service. Drives one scan session
// to a terminal state and prints the inventory; Ctrl+C cancels.

use std::sync::Arc;

use anyhow::Result;

use lanscan::api::client::ScanClient;
use lanscan::config::ClientConfig;
use lanscan::session::{ScanSessionManager, ScanState};

#[tokio::main]
async fn main() -> Result<()> {
    lanscan::logging::init()?;

    let config = ClientConfig::from_env()?;
    let client = Arc::new(ScanClient::new(config));

    match client.health_check().await {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            log::warn!("scan service health check failed; attempting the scan anyway");
        }
    }

    let manager = ScanSessionManager::new(client);
    let mut updates = manager.subscribe();
    manager.start_scan();
    println!("{}", manager.snapshot().status_message);

    let snapshot = loop {
        {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.state.is_terminal() {
                break snapshot;
            }
        }
        tokio::select! {
            changed = updates.changed() => changed?,
            _ = tokio::signal::ctrl_c() => manager.cancel(),
        }
    };

    match &snapshot.state {
        ScanState::Succeeded(result) => {
            println!("{}", snapshot.status_message);
            println!("Network:   {}", result.network.as_deref().unwrap_or("Unknown"));
            println!("Interface: {}", result.interface.as_deref().unwrap_or("Unknown"));
            println!("My IP:     {}", result.my_ip.as_deref().unwrap_or("Unknown"));
            for device in &result.devices {
                println!(
                    "{:<16} {:<18} {:<24} {:<20} ports: {}",
                    device.ip.as_deref().unwrap_or("-"),
                    device.mac.as_deref().unwrap_or("-"),
                    device.name.as_deref().unwrap_or("-"),
                    device.vendor.as_deref().unwrap_or("Unknown"),
                    device.open_ports_display(),
                );
            }
        }
        ScanState::Cancelled => {
            println!("{}", snapshot.status_message);
        }
        ScanState::Failed(err) => {
            log::debug!("scan failure detail: {:?}", err.transport());
            eprintln!("{}", snapshot.status_message);
            std::process::exit(1);
        }
        ScanState::Idle | ScanState::Running => unreachable!("loop exits on terminal states only"),
    }

    Ok(())
}
