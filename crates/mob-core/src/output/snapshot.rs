//! Snapshot Generation
//!
//! Captures the field between epochs and writes it under the output
//! directory at a fixed epoch interval.

use std::fs;
use std::path::{Path, PathBuf};

use mob_events::{CellSnapshot, FieldSnapshot, SunSnapshot};

use super::OutputError;
use crate::scheduler::Simulation;

/// Builds a read-only view of the committed field.
pub fn capture_snapshot(sim: &Simulation) -> FieldSnapshot {
    let epoch = sim.epoch();
    let sun = SunSnapshot {
        strength: sim.environment().sun_strength(epoch),
        gauge: sim.environment().sun_gauge(epoch),
    };
    let field = sim.field();
    let mut snapshot = FieldSnapshot::new(sim.season(), field.width(), field.height(), sun);
    let fork_threshold = sim.config().energy.to_fork;
    for (pos, mob) in field.iter() {
        snapshot.push_cell(CellSnapshot::new(pos.x, pos.y, mob.energy, fork_threshold));
    }
    snapshot
}

/// Writes periodic snapshots plus an always-current copy.
#[derive(Debug)]
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
    written: u64,
}

impl SnapshotWriter {
    /// Prepares `<dir>/snapshots`. An interval of zero disables periodic
    /// snapshots; the current-state file is still written on request.
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Result<Self, OutputError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join("snapshots"))?;
        Ok(Self {
            dir,
            interval,
            written: 0,
        })
    }

    pub fn should_snapshot(&self, epoch: u64) -> bool {
        self.interval > 0 && epoch % self.interval == 0
    }

    /// Number of periodic snapshots written so far.
    pub fn snapshot_count(&self) -> u64 {
        self.written
    }

    /// Writes `snapshots/<snapshot_id>.json` and returns its path.
    pub fn write_snapshot_to_dir(&mut self, snapshot: &FieldSnapshot) -> Result<PathBuf, OutputError> {
        let path = self
            .dir
            .join("snapshots")
            .join(format!("{}.json", snapshot.snapshot_id));
        write_snapshot(snapshot, &path)?;
        self.written += 1;
        Ok(path)
    }

    /// Overwrites `current_state.json`.
    pub fn write_current_state(&self, snapshot: &FieldSnapshot) -> Result<PathBuf, OutputError> {
        let path = self.dir.join("current_state.json");
        write_snapshot(snapshot, &path)?;
        Ok(path)
    }
}

pub fn write_snapshot(snapshot: &FieldSnapshot, path: impl AsRef<Path>) -> Result<(), OutputError> {
    fs::write(path, snapshot.to_json()?)?;
    Ok(())
}

pub fn read_snapshot(path: impl AsRef<Path>) -> Result<FieldSnapshot, OutputError> {
    let json = fs::read_to_string(path)?;
    Ok(FieldSnapshot::from_json(&json)?)
}
