//! Configuration System
//!
//! Every simulation constant lives here. Values load from a TOML file with
//! per-section defaults, so a file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::agent::{ACTION_COUNT, SENSE_INPUTS};

/// Default tuning file path
pub const DEFAULT_CONFIG_PATH: &str = "mobfield.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub brain: BrainConfig,
}

/// Run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub epochs: u64,
    /// Epochs between field snapshots (0 disables them)
    pub snapshot_interval: u64,
    /// Epochs between stats log lines (0 disables them)
    pub stats_interval: u64,
    /// Starting energy of the root mob
    pub root_energy: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            epochs: 100_000,
            snapshot_interval: 1_000,
            stats_interval: 16,
            root_energy: 20.0,
        }
    }
}

/// Grid dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 50,
        }
    }
}

/// Energy income, costs and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Sunlight yield scale
    pub earn: f64,
    /// Extra sunlight share still reaching the bottom row
    pub at_bottom: f64,
    pub per_move: f64,
    pub per_attack: f64,
    /// Fraction of the attacker's energy it can bite off a victim
    pub eat: f64,
    /// Multiplier on the produce output before action selection
    pub produce_priority: f64,
    pub to_fork: f64,
    pub loss_per_neighbor: f64,
    /// Charged per live mob, per mob, per epoch
    pub population_penalty: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            earn: 1.0,
            at_bottom: 0.1,
            per_move: 1.0,
            per_attack: 5.0,
            eat: 0.7,
            produce_priority: 1.1,
            to_fork: 200.0,
            loss_per_neighbor: 0.3,
            population_penalty: 1.0 / 300.0,
        }
    }
}

/// Depth gradients and the season clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub radiation_top: f64,
    pub radiation_bottom: f64,
    /// Normalized depth where food starts to appear
    pub foodgrad_top: f64,
    /// Normalized depth where food yield reaches `food_energy_earn`
    pub foodgrad_bottom: f64,
    pub food_energy_earn: f64,
    /// Half-period of the sun cycle, in epochs
    pub season_length: u64,
    pub global_starvation_level: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            radiation_top: 0.2,
            radiation_bottom: 0.8,
            foodgrad_top: 0.55,
            foodgrad_bottom: 1.0,
            food_energy_earn: 1.6,
            season_length: 4000,
            global_starvation_level: 0.05,
        }
    }
}

/// Controller network shape and inheritance policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub size: usize,
    /// Chance that each inherited scalar is perturbed
    pub mutation_probability: f64,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            size: 50,
            mutation_probability: 1.0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, or fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Returns the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every value the engine divides by or indexes with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field.width == 0 || self.field.height == 0 {
            return Err(ConfigError::Invalid("field dimensions must be non-zero"));
        }
        if i32::try_from(self.field.width).is_err() || i32::try_from(self.field.height).is_err() {
            return Err(ConfigError::Invalid("field dimensions must fit in i32"));
        }
        if self.environment.season_length == 0 {
            return Err(ConfigError::Invalid("season_length must be positive"));
        }
        if self.environment.foodgrad_bottom == self.environment.foodgrad_top {
            return Err(ConfigError::Invalid(
                "foodgrad_top and foodgrad_bottom must differ",
            ));
        }
        let radiation = [self.environment.radiation_top, self.environment.radiation_bottom];
        if radiation.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(ConfigError::Invalid(
                "radiation_top and radiation_bottom must be finite and non-negative",
            ));
        }
        if self.brain.size < SENSE_INPUTS + ACTION_COUNT {
            return Err(ConfigError::BrainTooSmall {
                size: self.brain.size,
                required: SENSE_INPUTS + ACTION_COUNT,
            });
        }
        if !(0.0..=1.0).contains(&self.brain.mutation_probability) {
            return Err(ConfigError::Invalid(
                "mutation_probability must be between 0.0 and 1.0",
            ));
        }
        if self.energy.to_fork <= 0.0 {
            return Err(ConfigError::Invalid("to_fork must be positive"));
        }
        Ok(())
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("brain size {size} cannot hold sensed inputs plus actions ({required})")]
    BrainTooSmall { size: usize, required: usize },
}
