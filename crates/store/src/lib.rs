//! SQLite store of known image layer digests.
//!
//! # Architecture
//! The store keeps two generations of `(hash_type, hash, image)` records:
//! - **Live**: everything observed during the last *completed* check cycle.
//!   This is the only generation membership queries ever look at.
//! - **Staging**: everything observed during the running cycle. It is promoted
//!   to live wholesale when the cycle is closed, or thrown away wholesale.
//!
//! A cycle that crashes or fails half way therefore never leaves a live
//! generation that mixes old and new observations.

mod db;
pub mod error;
mod models;
mod store;

pub use crate::models::{Digest, HashRecord};
pub use crate::store::{LayerStore, StagingPolicy};
