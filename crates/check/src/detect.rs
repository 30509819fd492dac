use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use piun_store::{Digest, LayerStore};
use tracing::instrument;

/// Records every digest of `image` for this cycle and reports whether any of
/// them is new since the previous cycle.
///
/// Every digest is staged, even after the first new one has been found;
/// stopping early would make the next cycle see the rest as new again. An
/// empty list (the registry could not be asked) is simply "no update".
#[instrument(skip(store, digests), fields(layers = digests.len()))]
pub async fn check_image(store: &LayerStore, image: &str, digests: &[String]) -> Result<bool> {
    let mut updated = false;
    for raw in digests {
        let digest = Digest::parse(raw);
        if digest.is_malformed() {
            tracing::warn!(image, digest = %raw, "Malformed layer digest; tracking it anyway");
        }
        let new = store.record_and_check(&digest, image).await.or_raise(|| ErrorKind::Store)?;
        if new {
            tracing::info!(image, %digest, "New layer digest");
        }
        updated |= new;
    }
    Ok(updated)
}
