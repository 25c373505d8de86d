//! Output Generation
//!
//! Field snapshots, the stats log and checkpoints. Everything here reads
//! the simulation between epochs and never mutates it.

pub mod checkpoint;
pub mod snapshot;
pub mod stats_log;

use thiserror::Error;

pub use checkpoint::*;
pub use snapshot::*;
pub use stats_log::*;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
