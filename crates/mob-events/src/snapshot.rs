//! Snapshot Types
//!
//! Serialization structs for field snapshots handed to renderers.
//!
//! A snapshot is taken between epochs and is read-only: consumers may render
//! it, diff it or archive it, but never feed it back into the engine.

use serde::{Deserialize, Serialize};

use crate::SeasonStamp;

/// Generates a snapshot ID for the given epoch.
pub fn generate_snapshot_id(epoch: u64) -> String {
    format!("snap_{:08}", epoch)
}

/// Solar input at the time of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunSnapshot {
    /// Raw multiplier applied to sunlight yield
    pub strength: f64,
    /// Strength mapped onto [0, 1] for gauge display
    pub gauge: f64,
}

/// One occupied cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub x: i32,
    pub y: i32,
    pub energy: f64,
    /// Energy scaled against the reproduction threshold, saturating at 255
    pub intensity: u8,
}

impl CellSnapshot {
    /// Builds a cell entry, scaling `energy` into a 0..=255 colour channel
    /// against `fork_threshold`.
    pub fn new(x: i32, y: i32, energy: f64, fork_threshold: f64) -> Self {
        Self {
            x,
            y,
            energy,
            intensity: energy_intensity(energy, fork_threshold),
        }
    }
}

/// Maps an energy level onto a 0..=255 intensity.
pub fn energy_intensity(energy: f64, fork_threshold: f64) -> u8 {
    if fork_threshold <= 0.0 || !energy.is_finite() {
        return 0;
    }
    (energy * (255.0 / fork_threshold)).clamp(0.0, 255.0) as u8
}

/// Complete view of the field between two epochs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub snapshot_id: String,
    pub timestamp: SeasonStamp,
    pub width: u32,
    pub height: u32,
    pub population: usize,
    pub sun: SunSnapshot,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<CellSnapshot>,
}

impl FieldSnapshot {
    pub fn new(timestamp: SeasonStamp, width: u32, height: u32, sun: SunSnapshot) -> Self {
        Self {
            snapshot_id: generate_snapshot_id(timestamp.epoch),
            timestamp,
            width,
            height,
            population: 0,
            sun,
            cells: Vec::new(),
        }
    }

    /// Appends an occupied cell and bumps the population count.
    pub fn push_cell(&mut self, cell: CellSnapshot) {
        self.cells.push(cell);
        self.population = self.cells.len();
    }

    /// Looks up the entry at (x, y), if occupied.
    pub fn cell_at(&self, x: i32, y: i32) -> Option<&CellSnapshot> {
        self.cells.iter().find(|c| c.x == x && c.y == y)
    }

    /// Mean energy across occupied cells, zero when empty.
    pub fn mean_energy(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().map(|c| c.energy).sum::<f64>() / self.cells.len() as f64
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FieldSnapshot {
        let sun = SunSnapshot {
            strength: 0.95,
            gauge: 0.5,
        };
        let mut snapshot = FieldSnapshot::new(SeasonStamp::from_epoch(16, 4000), 200, 50, sun);
        snapshot.push_cell(CellSnapshot::new(100, 25, 20.0, 200.0));
        snapshot.push_cell(CellSnapshot::new(101, 25, 400.0, 200.0));
        snapshot
    }

    #[test]
    fn test_snapshot_id_format() {
        assert_eq!(generate_snapshot_id(42), "snap_00000042");
    }

    #[test]
    fn test_energy_intensity_scaling() {
        assert_eq!(energy_intensity(0.0, 200.0), 0);
        assert_eq!(energy_intensity(100.0, 200.0), 127);
        assert_eq!(energy_intensity(1000.0, 200.0), 255);
        assert_eq!(energy_intensity(-5.0, 200.0), 0);
        assert_eq!(energy_intensity(50.0, 0.0), 0);
    }

    #[test]
    fn test_push_cell_tracks_population() {
        let snapshot = sample();
        assert_eq!(snapshot.population, 2);
        assert_eq!(snapshot.cell_at(101, 25).unwrap().intensity, 255);
        assert!(snapshot.cell_at(0, 0).is_none());
        assert!((snapshot.mean_energy() - 210.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = sample();
        let json = snapshot.to_json().unwrap();
        assert!(json.contains(r#""snapshot_id": "snap_00000016""#));
        assert!(json.contains(r#""label": "cycle_0.rising""#));

        let parsed = FieldSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed.population, 2);
        assert_eq!(parsed.cells, snapshot.cells);
    }

    #[test]
    fn test_empty_snapshot_omits_cells() {
        let sun = SunSnapshot {
            strength: 1.0,
            gauge: 0.5,
        };
        let snapshot = FieldSnapshot::new(SeasonStamp::from_epoch(0, 10), 4, 4, sun);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("cells"));
        assert_eq!(snapshot.mean_energy(), 0.0);
    }
}
