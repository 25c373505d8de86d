//! Shared snapshot and statistics types for the mob field simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! Renderers and analysis tools depend on it without pulling in the engine.

pub mod season;
pub mod snapshot;
pub mod stats;

// Re-export season clock types
pub use season::{ParseSeasonError, Season, SeasonLabel, SeasonStamp, SEASONS_PER_CYCLE};

// Re-export snapshot types
pub use snapshot::{
    energy_intensity, generate_snapshot_id, CellSnapshot, FieldSnapshot, SunSnapshot,
};

// Re-export statistics types
pub use stats::{EpochStats, RunSummary};
