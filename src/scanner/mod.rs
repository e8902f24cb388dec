pub mod decode;
pub mod process;
pub mod types;

pub use decode::decode;
pub use process::{RawScanOutput, ScannerProcess};
