//! Epoch Statistics Types
//!
//! Per-epoch counters and the end-of-run summary.

use serde::{Deserialize, Serialize};

/// Counters gathered over a single epoch.
///
/// Serialized one object per line into the stats log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: u64,
    /// Live mobs after the commit
    pub population: usize,
    pub births: usize,
    pub starvations: usize,
    pub overcrowding_deaths: usize,
    pub moves: usize,
    pub blocked_moves: usize,
    pub attacks: usize,
    pub hits: usize,
    pub produces: usize,
    /// Staged insertions that lost their target cell during commit
    pub rejected_insertions: usize,
    pub mean_energy: f64,
}

impl EpochStats {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ..Self::default()
        }
    }

    pub fn deaths(&self) -> usize {
        self.starvations + self.overcrowding_deaths
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Aggregate over a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub first_epoch: u64,
    /// Last committed epoch
    pub last_epoch: u64,
    pub epochs: u64,
    pub final_population: usize,
    pub peak_population: usize,
    pub peak_epoch: u64,
    pub total_births: usize,
    pub total_deaths: usize,
    pub total_attacks: usize,
    pub extinct: bool,
}

impl RunSummary {
    pub fn new(first_epoch: u64, population: usize) -> Self {
        Self {
            first_epoch,
            last_epoch: first_epoch,
            final_population: population,
            peak_population: population,
            peak_epoch: first_epoch,
            ..Self::default()
        }
    }

    /// Folds one epoch's counters into the summary.
    pub fn record(&mut self, stats: &EpochStats) {
        self.last_epoch = stats.epoch;
        self.epochs += 1;
        self.final_population = stats.population;
        self.total_births += stats.births;
        self.total_deaths += stats.deaths();
        self.total_attacks += stats.attacks;
        if stats.population > self.peak_population {
            self.peak_population = stats.population;
            self.peak_epoch = stats.epoch;
        }
        self.extinct = stats.population == 0;
    }

    pub fn epochs_run(&self) -> u64 {
        self.epochs
    }
}
