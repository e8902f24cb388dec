use std::process::Stdio;

use tokio::process::Command;

use crate::config::ScannerConfig;
use crate::error::ProcessError;

/// One scanner invocation's captured result. Created per call, consumed
/// once by the decoder, never persisted.
#[derive(Debug, Clone)]
pub struct RawScanOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

/// Launches the external scan script and enforces its execution contract:
/// full stream capture, exit-code check, and a silent-success check.
pub struct ScannerProcess {
    config: ScannerConfig,
}

impl ScannerProcess {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<RawScanOutput, ProcessError> {
        // Checked up front so a missing install is reported as such, not
        // as an interpreter complaint about an unreadable argument.
        if !self.config.script_path.exists() {
            return Err(ProcessError::NotFound {
                path: self.config.script_path.clone(),
            });
        }

        let interpreter =
            which::which(&self.config.interpreter).map_err(|err| ProcessError::SpawnFailed {
                detail: format!("{}: {}", self.config.interpreter, err),
            })?;

        log::info!(
            "running scanner: {} {}",
            interpreter.display(),
            self.config.script_path.display()
        );

        // kill_on_drop: if the caller abandons this future (timeout,
        // client disconnect), the scanner must not be left running.
        let output = Command::new(&interpreter)
            .arg(&self.config.script_path)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| ProcessError::SpawnFailed {
                detail: err.to_string(),
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            log::error!("scanner exited with code {}", exit_code);
            return Err(ProcessError::NonZeroExit {
                code: exit_code,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        if String::from_utf8_lossy(&output.stdout).trim().is_empty() {
            log::error!("scanner exited cleanly but produced no output");
            return Err(ProcessError::EmptyOutput {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(RawScanOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
        })
    }
}
