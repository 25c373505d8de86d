//! Mob
//!
//! A mob senses its surroundings, feeds them to its brain and acts on the
//! strongest of nine outputs: produce energy, move one cell, or attack one
//! cell.

use serde::{Deserialize, Serialize};

use crate::brain::Brain;
use crate::config::EnergyConfig;
use crate::environment::Environment;
use crate::field::{Field, Position};

/// Length of the sensed environment vector.
pub const SENSE_INPUTS: usize = 13;

/// Number of action outputs read from the tail of the brain.
pub const ACTION_COUNT: usize = 9;

/// Period of the epoch phase input.
pub const EPOCH_PHASE_PERIOD: u64 = 16;

/// A living mob.
///
/// Serializes as position, energy and brain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mob {
    pub position: Position,
    pub energy: f64,
    pub brain: Brain,
}

/// Step direction for moves and attacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }
}

/// What a mob chose to do this epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Produce,
    Move(Direction),
    Attack(Direction),
}

impl Action {
    /// Maps an output index onto an action.
    ///
    /// # Panics
    ///
    /// Panics on an index outside `0..ACTION_COUNT`.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Action::Produce,
            1 => Action::Move(Direction::Left),
            2 => Action::Move(Direction::Right),
            3 => Action::Move(Direction::Up),
            4 => Action::Move(Direction::Down),
            5 => Action::Attack(Direction::Left),
            6 => Action::Attack(Direction::Right),
            7 => Action::Attack(Direction::Up),
            8 => Action::Attack(Direction::Down),
            other => panic!("unknown action index {other}"),
        }
    }
}

/// Outcome of a resolved action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionResult {
    Produced(f64),
    Moved(Position),
    Blocked,
    Hit(f64),
    Missed,
}

/// Everything a mob did in one turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Turn {
    /// `None` if the mob was already exhausted before deciding
    pub action: Option<(Action, ActionResult)>,
    pub alive: bool,
}

impl Turn {
    /// New cell the mob claimed this turn, if it moved.
    pub fn moved_to(&self) -> Option<Position> {
        match self.action {
            Some((_, ActionResult::Moved(to))) => Some(to),
            _ => None,
        }
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

impl Mob {
    pub fn new(brain: Brain, energy: f64, position: Position) -> Self {
        Self {
            position,
            energy,
            brain,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.energy > 0.0
    }

    /// Builds the sensed input vector.
    ///
    /// Layout: eight neighbour occupancy flags (N, NE, E, SE, S, SW, W, NW),
    /// x / width, y / height, energy relative to the fork threshold, epoch
    /// phase, and the caller-supplied `noise` draw.
    pub fn sense(&self, field: &Field, epoch: u64, fork_threshold: f64, noise: f64) -> [f64; SENSE_INPUTS] {
        let mut env = [0.0; SENSE_INPUTS];
        for (slot, occupied) in env.iter_mut().zip(field.neighbor_occupancy(self.position)) {
            *slot = if occupied { 1.0 } else { 0.0 };
        }
        env[8] = f64::from(self.position.x) / f64::from(field.width());
        env[9] = f64::from(self.position.y) / f64::from(field.height());
        env[10] = self.energy / fork_threshold;
        env[11] = (epoch % EPOCH_PHASE_PERIOD) as f64;
        env[12] = noise;
        env
    }

    /// Runs the brain on `environment` and picks an action.
    ///
    /// The action outputs are the last nine activations read backwards, so
    /// the final unit drives "produce". Produce is boosted by `priority`.
    ///
    /// # Panics
    ///
    /// Panics if the brain is too small to hold the input and the outputs.
    pub fn decide(&mut self, environment: &[f64], priority: f64) -> Action {
        let data = self.brain.evaluate(environment);
        assert!(
            data.len() >= environment.len() + ACTION_COUNT,
            "brain of size {} too small for {} inputs and {} actions",
            data.len(),
            environment.len(),
            ACTION_COUNT
        );
        let mut outputs: Vec<f64> = data.iter().rev().take(ACTION_COUNT).copied().collect();
        outputs[0] *= priority;
        Action::from_index(argmax(&outputs))
    }
}

/// Context a turn is resolved in.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub epoch: u64,
    pub energy: &'a EnergyConfig,
    pub environment: &'a Environment,
}

/// Plays out one turn for the mob keyed at `key`.
///
/// The mob decides on `senses`, pays for and resolves its action, then pays
/// upkeep for every occupied neighbour of the cell it now claims. Occupancy
/// is read from `field` as it stands, which during an epoch is the pre-epoch
/// layout; the mob's relocation is left for the caller to stage.
///
/// # Panics
///
/// Panics if no mob lives at `key`.
pub fn take_turn(field: &mut Field, key: Position, senses: &[f64], ctx: TurnContext<'_>) -> Turn {
    let Some(mob) = field.get_mut(key) else {
        panic!("no mob at {key}");
    };
    if !mob.is_alive() {
        return Turn {
            action: None,
            alive: false,
        };
    }

    let from = mob.position;
    let action = mob.decide(senses, ctx.energy.produce_priority);
    let result = match action {
        Action::Produce => {
            let gained = ctx.environment.cell_energy(from.y, ctx.epoch);
            mob.energy += gained;
            ActionResult::Produced(gained)
        }
        Action::Move(dir) => {
            mob.energy -= ctx.energy.per_move;
            let (dx, dy) = dir.delta();
            let target = field.offset(from, dx, dy);
            if field.is_occupied(target) {
                ActionResult::Blocked
            } else {
                ActionResult::Moved(target)
            }
        }
        Action::Attack(dir) => {
            mob.energy -= ctx.energy.per_attack;
            let max_bite = mob.energy * ctx.energy.eat;
            let (dx, dy) = dir.delta();
            let target = field.offset(from, dx, dy);
            if target == key || !field.is_occupied(target) {
                ActionResult::Missed
            } else {
                ActionResult::Hit(field.bite(target, max_bite))
            }
        }
    };

    let now_at = match result {
        ActionResult::Moved(target) => target,
        _ => from,
    };
    let crowding = field.occupied_neighbors(now_at) as f64 * ctx.energy.loss_per_neighbor;

    let Some(mob) = field.get_mut(key) else {
        panic!("mob at {key} vanished mid-turn");
    };
    if let ActionResult::Hit(gained) = result {
        mob.energy += gained;
    }
    mob.position = now_at;
    mob.energy -= crowding;

    Turn {
        action: Some((action, result)),
        alive: mob.is_alive(),
    }
}
