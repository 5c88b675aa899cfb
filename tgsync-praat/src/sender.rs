//! Delivery of hand-off scripts to the external tool
//!
//! The error channel is textual: a tool that prints anything on stderr or
//! exits unsuccessfully has refused the script.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tgsync_common::{Error, Result};
use tokio::process::Command;
use tracing::debug;

/// A running external editor that accepts scripts
#[async_trait]
pub trait ExternalTool: Send + Sync {
    fn name(&self) -> &str;

    /// Hand `script` to the tool. Returns once the tool has accepted or
    /// refused it; never waits for the user to finish editing.
    async fn send(&self, script: &str) -> Result<()>;
}

/// Sends scripts to a running Praat through `praat --send`
#[derive(Debug, Clone)]
pub struct PraatSender {
    binary: PathBuf,
}

impl PraatSender {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ExternalTool for PraatSender {
    fn name(&self) -> &str {
        "Praat"
    }

    async fn send(&self, script: &str) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("tgsync-")
            .suffix(".praat")
            .tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        debug!(
            "Sending script {} via {}",
            file.path().display(),
            self.binary.display()
        );
        let output = Command::new(&self.binary)
            .arg("--send")
            .arg(file.path())
            .output()
            .await
            .map_err(|e| {
                Error::ExternalTool(format!("cannot run {}: {}", self.binary.display(), e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return Err(Error::ExternalTool(stderr.to_string()));
        }
        if !output.status.success() {
            return Err(Error::ExternalTool(format!(
                "{} exited with {}",
                self.binary.display(),
                output.status
            )));
        }
        Ok(())
    }
}
