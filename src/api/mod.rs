pub mod client;
pub mod types;

pub use client::{ScanClient, ScanTransport};
pub use types::ScanErrorBody;
