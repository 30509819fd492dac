//! Two-generation layer-hash store.
//!
//! The `layer` table holds the *live* generation: every digest seen during the
//! last completed check cycle. Observations of the running cycle go into
//! `layer_staging`, and membership is only ever tested against `layer`. When
//! the cycle completes, staging replaces live in a single transaction so the
//! live generation is always either entirely old or entirely new.

use crate::db::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Digest, HashRecord};
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

/// What to do with a staging table left behind by an interrupted cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StagingPolicy {
    /// Drop and recreate staging on open, so leftovers are never promoted.
    #[default]
    Discard,
    /// Keep leftover rows; they are promoted with the next commit. Duplicate
    /// rows are harmless to membership, they only waste space.
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    /// Staging is accumulating; close will commit it.
    Open,
    /// Staging has been promoted; there is no staging table until
    /// [`LayerStore::reset_staging`] recreates one.
    Committed,
    Closed,
}

/// The layer-hash store for a single check cycle.
///
/// Acquire with [`open`](Self::open), release with [`close`](Self::close)
/// (commits) or [`abandon`](Self::abandon) (does not). Dropping the store
/// without either never commits: an unfinished cycle must not replace the
/// live generation.
#[derive(Debug)]
pub struct LayerStore {
    db: Database,
    session: Session,
}

impl LayerStore {
    /// Open (or create) the store at `path`, discarding stale staging rows.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StagingPolicy::default()).await
    }

    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open_with(path: impl AsRef<Path>, policy: StagingPolicy) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::connect(path).await?;
        Self::prepare(db, policy).await.or_raise(|| ErrorKind::Unavailable(path.to_path_buf()))
    }

    /// Open a throwaway in-memory store (useful for testing).
    ///
    /// Not `#[cfg(test)]` so that other crates can use it in their tests.
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::connect_in_memory().await?;
        Self::prepare(db, StagingPolicy::default()).await
    }

    async fn prepare(db: Database, policy: StagingPolicy) -> Result<Self> {
        sqlx::query(include_str!("../queries/create_live.sql"))
            .execute(db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        if policy == StagingPolicy::Discard {
            sqlx::query(include_str!("../queries/drop_staging.sql"))
                .execute(db.pool())
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        sqlx::query(include_str!("../queries/create_staging.sql"))
            .execute(db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(location = %db.location().display(), ?policy, "Layer store ready");
        Ok(Self { db, session: Session::Open })
    }

    /// Whether the digest was seen for `image` during the last completed cycle.
    pub async fn is_known(&self, digest: &Digest, image: &str) -> Result<bool> {
        let known: i64 = sqlx::query_scalar(include_str!("../queries/is_known.sql"))
            .bind(digest.kind.as_deref())
            .bind(digest.value.as_deref())
            .bind(image)
            .fetch_one(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(known != 0)
    }

    /// Record an observation for this cycle. Duplicates are simply appended.
    pub async fn stage(&self, digest: &Digest, image: &str) -> Result<()> {
        sqlx::query(include_str!("../queries/stage.sql"))
            .bind(digest.kind.as_deref())
            .bind(digest.value.as_deref())
            .bind(image)
            .execute(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Stage the digest, then report whether it is new relative to the last
    /// completed cycle.
    pub async fn record_and_check(&self, digest: &Digest, image: &str) -> Result<bool> {
        self.stage(digest, image).await?;
        Ok(!self.is_known(digest, image).await?)
    }

    /// All live records for `image`, in insertion order.
    pub async fn live_records(&self, image: &str) -> Result<Vec<HashRecord>> {
        sqlx::query_as::<_, HashRecord>(include_str!("../queries/list_live_for_image.sql"))
            .bind(image)
            .fetch_all(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Promote staging to live, replacing the previous generation wholesale.
    ///
    /// Calling this more than once per session is a no-op until
    /// [`reset_staging`](Self::reset_staging) starts a new cycle.
    #[instrument(skip(self))]
    pub async fn commit_cycle(&mut self) -> Result<()> {
        if self.session != Session::Open {
            tracing::debug!(session = ?self.session, "Nothing staged to commit");
            return Ok(());
        }
        let mut tx = self.db.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/drop_live.sql"))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/promote_staging.sql"))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        self.session = Session::Committed;
        tracing::info!(location = %self.db.location().display(), "Committed new layer generation");
        Ok(())
    }

    /// Start a fresh, empty staging generation on an already open store.
    pub async fn reset_staging(&mut self) -> Result<()> {
        sqlx::query(include_str!("../queries/drop_staging.sql"))
            .execute(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/create_live.sql"))
            .execute(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/create_staging.sql"))
            .execute(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.session = Session::Open;
        Ok(())
    }

    /// Commit the cycle (unless already committed) and release the store.
    ///
    /// The connection pool is released even if the commit fails.
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        let committed = self.commit_cycle().await;
        self.session = Session::Closed;
        self.db.close().await;
        committed
    }

    /// Release the store without committing; the live generation is untouched.
    #[instrument(skip(self))]
    pub async fn abandon(mut self) {
        if self.session == Session::Open {
            tracing::warn!(location = %self.db.location().display(), "Abandoning cycle; staged layers discarded");
        }
        self.session = Session::Closed;
        self.db.close().await;
    }

    /// Delete the backing file at `path`, along with its WAL sidecars.
    ///
    /// Must not be called while a store is open on the same path. A missing
    /// file is not an error.
    pub fn reset(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        for suffix in ["", "-wal", "-shm"] {
            let mut target = path.as_os_str().to_owned();
            target.push(suffix);
            match std::fs::remove_file(&target) {
                Ok(()) => tracing::info!(path = %Path::new(&target).display(), "Removed layer store file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(e).or_raise(|| ErrorKind::Reset(path.to_path_buf())),
            }
        }
        Ok(())
    }
}

impl Drop for LayerStore {
    fn drop(&mut self) {
        if self.session != Session::Closed {
            tracing::warn!(
                location = %self.db.location().display(),
                "Layer store dropped without being closed; nothing was committed"
            );
        }
    }
}
