//! Checkpoints
//!
//! Full field state between epochs, saved as JSON so a run can be resumed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::Mob;
use crate::config::Config;
use crate::scheduler::{SimError, Simulation};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("checkpoint version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("invalid checkpoint: {0}")]
    Invalid(#[from] SimError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Next epoch to run
    pub epoch: u64,
    pub config: Config,
    pub mobs: Vec<Mob>,
}

impl Checkpoint {
    pub const VERSION: u32 = 1;

    pub fn capture(sim: &Simulation) -> Self {
        Self {
            version: Self::VERSION,
            epoch: sim.epoch(),
            config: sim.config().clone(),
            mobs: sim.field().mobs().cloned().collect(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let reader = BufReader::new(File::open(path)?);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
        if checkpoint.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }
        Ok(checkpoint)
    }

    /// Rebuilds the simulation, checking every brain against the config.
    pub fn restore(self) -> Result<Simulation, CheckpointError> {
        Ok(Simulation::restore(self.config, self.epoch, self.mobs)?)
    }
}
