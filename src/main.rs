//! piun: "podman image update notifier".
//!
//! Compares the layer digests the registry reports for each local container
//! image against those seen on the previous run, and sends a notification
//! for every image that gained a layer it has not seen before.

mod cli;
mod error;
mod logging;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use piun_check::run_cycle;
use piun_config::Config;
use piun_runtime::{Apprise, ImageSource, Podman, Skopeo};
use piun_store::{LayerStore, StagingPolicy};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if cli.reset {
        LayerStore::reset(&config.database).or_raise(|| ErrorKind::Reset)?;
    }

    let timeout = config.timeout();
    let podman = Podman::discover(config.watch_stopped, timeout).or_raise(|| ErrorKind::Tooling)?;
    let skopeo = Skopeo::discover(timeout).or_raise(|| ErrorKind::Tooling)?;
    let notifier = Apprise::new(config.notif.clone(), timeout);

    // Without a trustworthy image list, committing would forget every known
    // layer; skip the cycle and keep the live generation instead.
    let images = match podman.images().await {
        Ok(images) => images,
        Err(err) => {
            tracing::warn!(error = ?err, "Unable to get a list of local images; skipping check");
            return Ok(());
        },
    };

    let policy = match config.discard_stale_staging {
        true => StagingPolicy::Discard,
        false => StagingPolicy::Preserve,
    };
    let store = LayerStore::open_with(&config.database, policy).await.or_raise(|| ErrorKind::Store)?;
    run_cycle(store, &images, &skopeo, &notifier).await.or_raise(|| ErrorKind::Check)?;
    Ok(())
}
