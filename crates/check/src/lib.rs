//! Update detection for running container images.
//!
//! A check cycle walks every image, asks the registry for its layer digests
//! and compares them against the layers seen during the previous cycle. Any
//! unseen layer means the image changed upstream.

mod cycle;
mod detect;
pub mod error;

pub use crate::cycle::{CycleReport, NOTIFICATION_BODY, notification_title, run_cycle};
pub use crate::detect::check_image;
