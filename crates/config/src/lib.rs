//! Configuration loading for piun.
//!
//! Sources are layered, later ones overriding earlier ones:
//! 1. Built-in defaults.
//! 2. `piun.yml` in the user's config directory (`~/.config/piun/` on Linux).
//! 3. An explicitly requested file (`--config`), which must exist.
//! 4. `PIUN_*` environment variables.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::{BaseDirs, ProjectDirs};
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APPLICATION: &str = "piun";
const CONFIG_FILE: &str = "piun.yml";
const DATABASE_FILE: &str = "image.db";
const ENV_PREFIX: &str = "PIUN_";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where configuration is read from and state is kept by default.
#[derive(Debug, Clone)]
pub struct Locations {
    pub home: PathBuf,
    pub config_file: PathBuf,
    pub cache_dir: PathBuf,
}
impl Locations {
    pub fn discover() -> Result<Self> {
        let base = BaseDirs::new().ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
        let project = ProjectDirs::from("", "", APPLICATION).ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
        Ok(Self {
            home: base.home_dir().to_path_buf(),
            config_file: project.config_dir().join(CONFIG_FILE),
            cache_dir: project.cache_dir().to_path_buf(),
        })
    }

    /// Expand a leading `~` to the home directory.
    fn expand(&self, path: PathBuf) -> PathBuf {
        match path.strip_prefix("~") {
            Ok(rest) => self.home.join(rest),
            Err(_) => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Notification service URIs, in Apprise syntax (e.g. `ntfy://topic`).
    #[serde(default)]
    pub notif: Vec<String>,
    /// Also check images of containers that exist but are not running.
    #[serde(default)]
    pub watch_stopped: bool,
    /// Location of the layer store.
    pub database: PathBuf,
    /// Seconds any single external command may run before it is killed.
    pub timeout: u64,
    /// Throw away layers staged by a previous, interrupted run.
    pub discard_stale_staging: bool,
}

impl Config {
    fn defaults(locations: &Locations) -> Self {
        Self {
            notif: Vec::new(),
            watch_stopped: false,
            database: locations.cache_dir.join(DATABASE_FILE),
            timeout: DEFAULT_TIMEOUT_SECS,
            discard_stale_staging: true,
        }
    }

    /// Load configuration from every source, optionally including an
    /// explicitly requested file.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let locations = Locations::discover()?;
        Self::extract(Self::layered(&locations, override_path)?, &locations)
    }

    /// Every file layer with the environment on top.
    fn layered(locations: &Locations, override_path: Option<&Path>) -> Result<Figment> {
        Ok(Self::figment(locations, override_path)?.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn figment(locations: &Locations, override_path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::defaults(locations)));
        if locations.config_file.is_file() {
            tracing::info!(path = %locations.config_file.display(), "Loading config");
            figment = figment.merge(Yaml::file(&locations.config_file));
        }
        if let Some(path) = override_path {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            tracing::info!(path = %path.display(), "Loading config");
            figment = figment.merge(Yaml::file(path));
        }
        Ok(figment)
    }

    fn extract(figment: Figment, locations: &Locations) -> Result<Self> {
        let mut config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.database = locations.expand(config.database);
        tracing::debug!(?config, "Configuration resolved");
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
