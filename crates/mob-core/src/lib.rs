//! Mob Field Simulation Engine Library
//!
//! A grid of mobs, each steered by a small recurrent brain, living off a
//! depth and season dependent energy supply. Offspring inherit a mutated
//! copy of the parent's brain.

pub mod agent;
pub mod brain;
pub mod config;
pub mod control;
pub mod environment;
pub mod field;
pub mod output;
pub mod scheduler;

pub use agent::{Action, ActionResult, Direction, Mob, Turn};
pub use brain::Brain;
pub use config::{Config, ConfigError};
pub use control::RunControl;
pub use environment::Environment;
pub use field::{Field, FieldError, Position};
pub use scheduler::{SimError, Simulation};
