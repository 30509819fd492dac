use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// An external executable discovered on `PATH`.
#[derive(Debug, Clone)]
pub(crate) struct Program {
    name: &'static str,
    path: PathBuf,
}

impl Program {
    pub(crate) fn discover(name: &'static str) -> Result<Self> {
        let path = which::which(name).or_raise(|| ErrorKind::NotFound(name))?;
        tracing::trace!(program = name, path = %path.display(), "Discovered executable");
        Ok(Self { name, path })
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// A command for this program that can't read our stdin and dies with us.
    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.path);
        command.stdin(Stdio::null()).kill_on_drop(true);
        command
    }

    /// Run to completion and return stdout. A child still running after
    /// `timeout` is killed.
    pub(crate) async fn run(&self, mut command: Command, timeout: Duration) -> Result<Vec<u8>> {
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .or_raise(|| ErrorKind::Timeout(self.name))?
            .or_raise(|| ErrorKind::Io)?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Failed {
                program: self.name,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
