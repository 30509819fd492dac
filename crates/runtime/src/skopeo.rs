use crate::DigestSource;
use crate::error::{ErrorKind, Result};
use crate::program::Program;
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// Asks the remote registry for an image's layer digests.
#[derive(Debug, Clone)]
pub struct Skopeo {
    program: Program,
    timeout: Duration,
}

impl Skopeo {
    pub fn discover(timeout: Duration) -> Result<Self> {
        Ok(Self { program: Program::discover("skopeo")?, timeout })
    }
}

#[derive(Deserialize)]
struct Inspection {
    #[serde(rename = "Layers", default)]
    layers: Vec<String>,
}

#[async_trait]
impl DigestSource for Skopeo {
    #[instrument(skip(self))]
    async fn layer_digests(&self, image: &str) -> Result<Vec<String>> {
        let mut command = self.program.command();
        command.args(["inspect", "--no-tags"]).arg(format!("docker://{image}"));
        let stdout = self.program.run(command, self.timeout).await?;
        let layers = parse_layers(&stdout).or_raise(|| ErrorKind::InvalidOutput(self.program.name()))?;
        tracing::info!(image, layers = layers.len(), "Fetched remote layer digests");
        Ok(layers)
    }
}

fn parse_layers(json: &[u8]) -> serde_json::Result<Vec<String>> {
    Ok(serde_json::from_slice::<Inspection>(json)?.layers)
}
