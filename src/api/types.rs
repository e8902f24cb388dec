use serde::{Deserialize, Serialize};

/// Structured error document returned by the scan endpoint.
///
/// `raw`, `stderr` and `stdout` carry the scanner's own output when the
/// failure happened past the spawn, so nothing the process said is lost
/// across the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanErrorBody {
    pub error: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

impl ScanErrorBody {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
            raw: None,
            stderr: None,
            stdout: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }
}
