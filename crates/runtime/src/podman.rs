use crate::ImageSource;
use crate::error::Result;
use crate::program::Program;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::instrument;

/// Lists the images behind local Podman containers.
#[derive(Debug, Clone)]
pub struct Podman {
    program: Program,
    include_stopped: bool,
    timeout: Duration,
}

impl Podman {
    pub fn discover(include_stopped: bool, timeout: Duration) -> Result<Self> {
        Ok(Self { program: Program::discover("podman")?, include_stopped, timeout })
    }
}

#[async_trait]
impl ImageSource for Podman {
    #[instrument(skip(self), fields(include_stopped = self.include_stopped))]
    async fn images(&self) -> Result<Vec<String>> {
        let mut command = self.program.command();
        command.args(["container", "ls", "--format", "{{.Image}}"]);
        if self.include_stopped {
            command.arg("--all");
        }
        let stdout = self.program.run(command, self.timeout).await?;
        let images = parse_images(&stdout);
        tracing::info!(?images, "Checking the following images");
        Ok(images)
    }
}

/// Whitespace-separated image names, first occurrence wins.
///
/// Several containers commonly share one image; each image is checked once.
fn parse_images(stdout: &[u8]) -> Vec<String> {
    let stdout = String::from_utf8_lossy(stdout);
    let mut seen = HashSet::new();
    stdout
        .split_whitespace()
        .filter(|image| seen.insert(*image))
        .map(str::to_string)
        .collect()
}
