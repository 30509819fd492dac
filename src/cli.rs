use clap::Parser;
use std::path::PathBuf;

/// Notifies you when the images behind your containers change upstream.
#[derive(Parser, Debug)]
#[command(name = "piun", version, about, long_about = None)]
pub struct Cli {
    /// Override config file with given path
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log what is being checked, not just errors
    #[arg(short, long, overrides_with = "no_verbose")]
    pub verbose: bool,
    #[arg(long, overrides_with = "verbose", hide = true)]
    no_verbose: bool,

    /// Forget every known layer before checking
    #[arg(short, long, overrides_with = "no_reset")]
    pub reset: bool,
    #[arg(long, overrides_with = "reset", hide = true)]
    no_reset: bool,
}
