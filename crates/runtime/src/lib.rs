//! Thin wrappers around the external programs piun talks to.
//!
//! - [`Podman`] enumerates the images of local containers.
//! - [`Skopeo`] fetches layer digests from the remote registry.
//! - [`Apprise`] delivers notifications.
//!
//! Each sits behind a trait so the check cycle can be driven without any of
//! them installed.

mod apprise;
pub mod error;
mod podman;
mod program;
mod skopeo;

pub use crate::apprise::Apprise;
pub use crate::podman::Podman;
pub use crate::skopeo::Skopeo;
use crate::error::Result;
use async_trait::async_trait;

/// Something that knows which images are in use locally.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn images(&self) -> Result<Vec<String>>;
}

/// Something that can report the layer digests of an image, as `type:value`
/// strings in registry order.
#[async_trait]
pub trait DigestSource: Send + Sync {
    async fn layer_digests(&self, image: &str) -> Result<Vec<String>>;
}

/// Fire-and-forget user notifications. Failures are logged, never returned.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str);
}
