use crate::detect::check_image;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use piun_runtime::{DigestSource, Notifier};
use piun_store::LayerStore;
use tracing::instrument;

pub const NOTIFICATION_BODY: &str = "An updated version of this image was found on the remote repository.";

pub fn notification_title(image: &str) -> String {
    format!("Update available for {image}")
}

/// What a completed cycle saw.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Every image processed, in order.
    pub checked: Vec<String>,
    /// Images with at least one new layer.
    pub updated: Vec<String>,
    /// Images whose digests could not be fetched; treated as not updated.
    pub unreachable: Vec<String>,
}

/// Runs one full check cycle over `images`, then releases the store.
///
/// The store is consumed: it is closed (committing this cycle's layers as the
/// new live generation) once every image has been processed, or abandoned
/// without committing if the store itself fails part way through.
#[instrument(skip_all, fields(images = images.len()))]
pub async fn run_cycle(
    store: LayerStore,
    images: &[String],
    digests: &dyn DigestSource,
    notifier: &dyn Notifier,
) -> Result<CycleReport> {
    match check_all(&store, images, digests, notifier).await {
        Ok(report) => {
            store.close().await.or_raise(|| ErrorKind::Store)?;
            tracing::info!(
                checked = report.checked.len(),
                updated = report.updated.len(),
                unreachable = report.unreachable.len(),
                "Check cycle complete"
            );
            Ok(report)
        },
        Err(err) => {
            store.abandon().await;
            Err(err)
        },
    }
}

async fn check_all(
    store: &LayerStore,
    images: &[String],
    digests: &dyn DigestSource,
    notifier: &dyn Notifier,
) -> Result<CycleReport> {
    let mut report = CycleReport::default();
    for image in images {
        let layers = match digests.layer_digests(image).await {
            Ok(layers) => layers,
            Err(err) => {
                tracing::warn!(image = %image, error = ?err, "Unable to fetch remote layer digests");
                report.unreachable.push(image.clone());
                Vec::new()
            },
        };
        if check_image(store, image, &layers).await? {
            notifier.notify(&notification_title(image), NOTIFICATION_BODY).await;
            report.updated.push(image.clone());
        }
        report.checked.push(image.clone());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use piun_runtime::error::{ErrorKind as RuntimeErrorKind, Result as RuntimeResult};
    use piun_store::Digest;
    use sqlx::sqlite::SqliteConnectOptions;
    use sqlx::{ConnectOptions, Connection};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    /// Registry stand-in; images without an entry are unreachable.
    #[derive(Default)]
    struct FakeRegistry(HashMap<String, Vec<String>>);
    impl FakeRegistry {
        fn with(mut self, image: &str, layers: &[&str]) -> Self {
            self.0.insert(image.to_string(), layers.iter().map(|l| l.to_string()).collect());
            self
        }
    }
    #[async_trait]
    impl DigestSource for FakeRegistry {
        async fn layer_digests(&self, image: &str) -> RuntimeResult<Vec<String>> {
            match self.0.get(image) {
                Some(layers) => Ok(layers.clone()),
                None => exn::bail!(RuntimeErrorKind::Timeout("skopeo")),
            }
        }
    }

    /// Breaks the store from a second connection once `image` is fetched.
    struct StagingSaboteur<'a> {
        path: &'a Path,
        image: &'a str,
        registry: FakeRegistry,
    }
    #[async_trait]
    impl DigestSource for StagingSaboteur<'_> {
        async fn layer_digests(&self, image: &str) -> RuntimeResult<Vec<String>> {
            if image == self.image {
                let mut conn = SqliteConnectOptions::new().filename(self.path).connect().await.unwrap();
                sqlx::query("DROP TABLE layer_staging").execute(&mut conn).await.unwrap();
                conn.close().await.unwrap();
            }
            self.registry.layer_digests(image).await
        }
    }

    #[derive(Default)]
    struct FakeNotifier(Mutex<Vec<(String, String)>>);
    impl FakeNotifier {
        fn titles(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|(title, _)| title.clone()).collect()
        }
    }
    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn notify(&self, title: &str, body: &str) {
            self.0.lock().unwrap().push((title.to_string(), body.to_string()));
        }
    }

    fn images(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    async fn cycle(path: &Path, images: &[String], registry: &FakeRegistry) -> (CycleReport, FakeNotifier) {
        let notifier = FakeNotifier::default();
        let store = LayerStore::open(path).await.unwrap();
        let report = run_cycle(store, images, registry, &notifier).await.unwrap();
        (report, notifier)
    }

    #[tokio::test]
    async fn test_first_cycle_reports_every_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.db");
        let registry = FakeRegistry::default().with("app:1", &["sha256:aaa", "sha256:bbb"]).with("db:2", &["sha256:ccc"]);
        let (report, notifier) = cycle(&path, &images(&["app:1", "db:2"]), &registry).await;
        assert_eq!(report.checked, images(&["app:1", "db:2"]));
        assert_eq!(report.updated, images(&["app:1", "db:2"]));
        assert!(report.unreachable.is_empty());
        assert_eq!(notifier.titles(), vec!["Update available for app:1", "Update available for db:2"]);
        assert_eq!(notifier.0.lock().unwrap()[0].1, NOTIFICATION_BODY);

        let store = LayerStore::open(&path).await.unwrap();
        assert_eq!(store.live_records("app:1").await.unwrap().len(), 2);
        assert_eq!(store.live_records("db:2").await.unwrap().len(), 1);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_only_changed_images_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.db");
        let all = images(&["app:1", "db:2"]);
        let registry = FakeRegistry::default().with("app:1", &["sha256:aaa"]).with("db:2", &["sha256:ccc"]);
        cycle(&path, &all, &registry).await;

        let (report, notifier) = cycle(&path, &all, &registry).await;
        assert!(report.updated.is_empty());
        assert!(notifier.titles().is_empty());

        let registry = FakeRegistry::default().with("app:1", &["sha256:aaa", "sha256:new"]).with("db:2", &["sha256:ccc"]);
        let (report, notifier) = cycle(&path, &all, &registry).await;
        assert_eq!(report.updated, images(&["app:1"]));
        assert_eq!(notifier.titles(), vec!["Update available for app:1"]);
    }

    #[tokio::test]
    async fn test_unreachable_image_does_not_stop_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.db");
        let registry = FakeRegistry::default().with("db:2", &["sha256:ccc"]);
        let (report, notifier) = cycle(&path, &images(&["app:1", "db:2"]), &registry).await;
        assert_eq!(report.checked, images(&["app:1", "db:2"]));
        assert_eq!(report.unreachable, images(&["app:1"]));
        assert_eq!(report.updated, images(&["db:2"]));
        assert_eq!(notifier.titles(), vec!["Update available for db:2"]);
    }

    #[tokio::test]
    async fn test_cycle_replaces_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.db");
        let registry = FakeRegistry::default().with("app:1", &["sha256:aaa"]).with("gone:3", &["sha256:ddd"]);
        cycle(&path, &images(&["app:1", "gone:3"]), &registry).await;
        // The `gone:3` container was removed in the meantime.
        cycle(&path, &images(&["app:1"]), &registry).await;

        let store = LayerStore::open(&path).await.unwrap();
        assert!(store.is_known(&Digest::parse("sha256:aaa"), "app:1").await.unwrap());
        assert!(!store.is_known(&Digest::parse("sha256:ddd"), "gone:3").await.unwrap());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_images_commits_empty_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.db");
        let registry = FakeRegistry::default().with("app:1", &["sha256:aaa"]);
        cycle(&path, &images(&["app:1"]), &registry).await;
        let (report, notifier) = cycle(&path, &[], &registry).await;
        assert_eq!(report, CycleReport::default());
        assert!(notifier.titles().is_empty());

        let store = LayerStore::open(&path).await.unwrap();
        assert!(store.live_records("app:1").await.unwrap().is_empty());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_aborts_without_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.db");
        let all = images(&["app:1", "db:2"]);
        let registry = FakeRegistry::default().with("app:1", &["sha256:aaa"]).with("db:2", &["sha256:ccc"]);
        cycle(&path, &all, &registry).await;

        let saboteur = StagingSaboteur {
            path: &path,
            image: "db:2",
            registry: FakeRegistry::default().with("app:1", &["sha256:aaa", "sha256:new"]).with("db:2", &["sha256:ccc"]),
        };
        let notifier = FakeNotifier::default();
        let store = LayerStore::open(&path).await.unwrap();
        let err = run_cycle(store, &all, &saboteur, &notifier).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Store));

        // The half-finished cycle never replaced the previous generation.
        let store = LayerStore::open(&path).await.unwrap();
        assert!(store.is_known(&Digest::parse("sha256:aaa"), "app:1").await.unwrap());
        assert!(!store.is_known(&Digest::parse("sha256:new"), "app:1").await.unwrap());
        assert!(store.is_known(&Digest::parse("sha256:ccc"), "db:2").await.unwrap());
        store.close().await.unwrap();
    }
}
