//! Logging initialization for the lanscan binaries.
//!
//! Library code logs through the `log` facade; the binaries install a
//! `tracing-subscriber` with an `EnvFilter` (the bridge for `log` records
//! comes with the subscriber's default features).

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Call once, before anything logs.
pub fn init() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing subscriber: {}", err))?;

    Ok(())
}
