//! Epoch Scheduler
//!
//! One epoch runs in three stages:
//!
//! 1. every mob present at the start senses, pays the population penalty
//!    and takes its turn, in key order;
//! 2. deaths, moves and births are queued instead of applied, so every
//!    occupancy check in the pass sees the pre-epoch field;
//! 3. the queue is committed in one go.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use mob_events::{EpochStats, RunSummary, SeasonStamp};

use crate::agent::{take_turn, Action, ActionResult, Mob, TurnContext};
use crate::brain::Brain;
use crate::config::{Config, ConfigError};
use crate::control::RunControl;
use crate::environment::Environment;
use crate::field::{Field, FieldError, PendingChanges, Position};

/// Energy given to a mob that had to fork but found no room.
pub const OVERCROWDED_ENERGY: f64 = -100.0;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("brain at {0} does not match the configured size")]
    BrainShape(Position),
}

/// A self-contained simulation instance.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: Config,
    environment: Environment,
    field: Field,
    rng: SmallRng,
    epoch: u64,
}

impl Simulation {
    /// Starts a run with a single fresh mob at the centre of the field.
    pub fn new(config: Config) -> Result<Self, SimError> {
        let mut sim = Self::empty(config)?;
        let center = sim.field.center();
        let root = Mob::new(
            Brain::new(sim.config.brain.size),
            sim.config.simulation.root_energy,
            center,
        );
        sim.field.place(root, center)?;
        Ok(sim)
    }

    /// A run with no mobs yet, seeded from `config.simulation.seed`.
    pub fn empty(config: Config) -> Result<Self, SimError> {
        config.validate()?;
        let seed = config.simulation.seed;
        Ok(Self {
            environment: Environment::new(&config),
            field: Field::new(config.field.width, config.field.height),
            rng: SmallRng::seed_from_u64(seed),
            epoch: 0,
            config,
        })
    }

    /// Restores a run from saved mobs.
    ///
    /// The random stream restarts from `seed + epoch`, so resuming the same
    /// state twice replays identically.
    pub fn restore(config: Config, epoch: u64, mobs: Vec<Mob>) -> Result<Self, SimError> {
        let mut sim = Self::empty(config)?;
        sim.epoch = epoch;
        sim.rng = SmallRng::seed_from_u64(sim.config.simulation.seed.wrapping_add(epoch));
        for mob in mobs {
            let at = mob.position;
            if !mob.brain.is_well_formed() || mob.brain.size() != sim.config.brain.size {
                return Err(SimError::BrainShape(at));
            }
            sim.field.place(mob, at)?;
        }
        Ok(sim)
    }

    /// Adds a mob between epochs.
    pub fn spawn(&mut self, mob: Mob, at: Position) -> Result<(), SimError> {
        self.field.place(mob, at)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Next epoch to be run.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn population(&self) -> usize {
        self.field.len()
    }

    pub fn sun_strength(&self) -> f64 {
        self.environment.sun_strength(self.epoch)
    }

    pub fn season(&self) -> SeasonStamp {
        SeasonStamp::from_epoch(self.epoch, self.config.environment.season_length)
    }

    /// Runs one epoch and commits its changes.
    pub fn step(&mut self) -> EpochStats {
        let epoch = self.epoch;
        let fork_threshold = self.config.energy.to_fork;
        let penalty = self.config.energy.population_penalty * self.field.len() as f64;

        let mut stats = EpochStats::new(epoch);
        let mut pending = PendingChanges::new();

        for key in self.field.positions() {
            let Some(mob) = self.field.get(key) else {
                continue;
            };
            let noise = self.rng.gen::<f64>();
            let senses = mob.sense(&self.field, epoch, fork_threshold, noise);

            if let Some(mob) = self.field.get_mut(key) {
                mob.energy -= penalty;
            }

            let ctx = TurnContext {
                epoch,
                energy: &self.config.energy,
                environment: &self.environment,
            };
            let turn = take_turn(&mut self.field, key, &senses, ctx);

            match turn.action {
                Some((Action::Produce, _)) => stats.produces += 1,
                Some((Action::Move(_), ActionResult::Moved(_))) => stats.moves += 1,
                Some((Action::Move(_), _)) => stats.blocked_moves += 1,
                Some((Action::Attack(_), result)) => {
                    stats.attacks += 1;
                    if matches!(result, ActionResult::Hit(_)) {
                        stats.hits += 1;
                    }
                }
                None => {}
            }

            if !turn.alive {
                stats.starvations += 1;
                pending.remove(key);
                continue;
            }

            if !self.try_fork(key, &mut pending) {
                stats.overcrowding_deaths += 1;
                pending.remove(key);
                continue;
            }

            if let Some(to) = turn.moved_to() {
                pending.relocate(key, to);
            }
        }

        let report = self.field.commit(pending);
        stats.births = report.spawned;
        stats.rejected_insertions = report.rejected();
        stats.population = self.field.len();
        if stats.population > 0 {
            stats.mean_energy = self.field.total_energy() / stats.population as f64;
        }

        debug!(
            epoch,
            population = stats.population,
            births = stats.births,
            deaths = stats.deaths(),
            rejected = stats.rejected_insertions,
            "epoch committed"
        );

        self.epoch += 1;
        stats
    }

    /// Forks the mob at `key` if it has grown past the threshold.
    ///
    /// Returns false when the mob had to fork but every neighbouring cell
    /// was taken; the mob is then marked with [`OVERCROWDED_ENERGY`].
    fn try_fork(&mut self, key: Position, pending: &mut PendingChanges) -> bool {
        let Some(mob) = self.field.get(key) else {
            return true;
        };
        if mob.energy <= self.config.energy.to_fork {
            return true;
        }

        let at = mob.position;
        let free = self.field.free_neighbors(at);
        let Some(mob) = self.field.get_mut(key) else {
            return true;
        };
        if free.is_empty() {
            mob.energy = OVERCROWDED_ENERGY;
            return false;
        }

        let target = free[self.rng.gen_range(0..free.len())];
        let intensity = self.environment.radiation(at.y);
        mob.energy /= 2.0;
        let brain = mob
            .brain
            .mutated_copy(intensity, self.config.brain.mutation_probability, &mut self.rng);
        pending.spawn(target, Mob::new(brain, mob.energy, target));
        true
    }

    /// Runs up to `epochs` epochs, honouring `control` between them.
    ///
    /// `observe` sees the committed state after every epoch. The run ends
    /// early if the population dies out or a stop is requested.
    pub fn run<F>(&mut self, epochs: u64, control: &RunControl, mut observe: F) -> RunSummary
    where
        F: FnMut(&Simulation, &EpochStats),
    {
        let mut summary = RunSummary::new(self.epoch, self.field.len());
        for _ in 0..epochs {
            if control.should_stop() {
                info!(epoch = self.epoch, "stop requested");
                break;
            }
            let stats = self.step();
            summary.record(&stats);
            observe(self, &stats);

            if self.field.is_empty() {
                info!(epoch = stats.epoch, "population died out");
                break;
            }
            control.wait_if_paused();
            control.pace();
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.field.width = 20;
        config.field.height = 10;
        config.brain.size = 24;
        config
    }

    /// Brain whose produce output always wins: zero weights and full
    /// retention freeze the tail.
    fn producer(n: usize) -> Brain {
        let mut data = vec![0.0; n];
        data[n - 1] = 1.0;
        Brain::from_parts(vec![vec![0.0; n]; n], vec![1.0; n], data).unwrap()
    }

    fn attacker_right(n: usize) -> Brain {
        let mut data = vec![0.0; n];
        data[n - 1 - 6] = 1.0;
        Brain::from_parts(vec![vec![0.0; n]; n], vec![1.0; n], data).unwrap()
    }

    fn assert_field_consistent(sim: &Simulation) {
        for (pos, mob) in sim.field().iter() {
            assert_eq!(*pos, mob.position);
        }
    }

    #[test]
    fn test_new_places_root_at_center() {
        let sim = Simulation::new(Config::default()).unwrap();
        assert_eq!(sim.population(), 1);
        let (pos, mob) = sim.field().iter().next().unwrap();
        assert_eq!(*pos, Position::new(100, 25));
        assert_eq!(mob.energy, 20.0);
        assert_eq!(sim.epoch(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.brain.size = 10;
        assert!(matches!(Simulation::new(config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_step_advances_epoch() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let stats = sim.step();
        assert_eq!(stats.epoch, 0);
        assert_eq!(sim.epoch(), 1);
    }

    #[test]
    fn test_population_penalty_scales_with_count() {
        let config = small_config();
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();
        sim.spawn(Mob::new(producer(n), 10.0, Position::new(2, 2)), Position::new(2, 2))
            .unwrap();
        sim.spawn(Mob::new(producer(n), 10.0, Position::new(8, 2)), Position::new(8, 2))
            .unwrap();
        sim.step();

        let gain = sim.environment().cell_energy(2, 0);
        let penalty = sim.config().energy.population_penalty * 2.0;
        let mob = sim.field().get(Position::new(2, 2)).unwrap();
        assert!((mob.energy - (10.0 - penalty + gain)).abs() < 1e-12);
    }

    #[test]
    fn test_exhausted_mob_removed() {
        let config = small_config();
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();
        sim.spawn(Mob::new(producer(n), 0.001, Position::new(2, 2)), Position::new(2, 2))
            .unwrap();
        let stats = sim.step();
        assert_eq!(stats.starvations, 1);
        assert_eq!(sim.population(), 0);
    }

    #[test]
    fn test_fork_halves_energy_and_places_clone() {
        let config = small_config();
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();
        let parent_at = Position::new(5, 5);
        sim.spawn(Mob::new(producer(n), 300.0, parent_at), parent_at).unwrap();
        let parent_brain = sim.field().get(parent_at).unwrap().brain.clone();

        let stats = sim.step();
        assert_eq!(stats.births, 1);
        assert_eq!(sim.population(), 2);

        let parent = sim.field().get(parent_at).unwrap();
        let (child_at, child) = sim
            .field()
            .iter()
            .find(|(pos, _)| **pos != parent_at)
            .unwrap();
        assert_eq!(parent.energy, child.energy);
        let turn_energy = 300.0 - sim.config().energy.population_penalty
            + sim.environment().cell_energy(5, 0);
        assert!((parent.energy - turn_energy / 2.0).abs() < 1e-9);
        assert!((child_at.x - parent_at.x).abs() <= 1 && (child_at.y - parent_at.y).abs() <= 1);

        // Connections are untouched by evaluation, so the parent's pre-turn
        // weights are the ones the clone was mutated from.
        let intensity = sim.environment().radiation(parent_at.y);
        let connections_shift = child
            .brain
            .connections()
            .iter()
            .flatten()
            .zip(parent_brain.connections().iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(connections_shift <= intensity + 1e-12);
        assert_field_consistent(&sim);
    }

    #[test]
    fn test_overcrowded_fork_dies_same_epoch() {
        let config = small_config();
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();
        let center = Position::new(5, 5);
        // Keep the neighbours alive but unable to fork.
        for dy in -1..=1 {
            for dx in -1..=1 {
                let at = Position::new(5 + dx, 5 + dy);
                let energy = if at == center { 1000.0 } else { 50.0 };
                sim.spawn(Mob::new(producer(n), energy, at), at).unwrap();
            }
        }
        let stats = sim.step();
        assert_eq!(stats.overcrowding_deaths, 1);
        assert!(!sim.field().is_occupied(center));
        assert_eq!(sim.population(), 8);
    }

    #[test]
    fn test_attack_victim_capped() {
        let mut config = small_config();
        config.energy.population_penalty = 0.0;
        config.energy.loss_per_neighbor = 0.0;
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();
        let attacker = Position::new(3, 3);
        let victim = Position::new(4, 3);
        sim.spawn(Mob::new(attacker_right(n), 10.0, attacker), attacker).unwrap();
        sim.spawn(Mob::new(producer(n), 3.0, victim), victim).unwrap();

        let stats = sim.step();
        assert_eq!(stats.hits, 1);
        // Attacker: 10 - 5 + min(3, 5 * 0.7)
        assert!((sim.field().get(attacker).unwrap().energy - 8.0).abs() < 1e-12);
        // Victim hit to zero before its own turn and then starves.
        assert!(!sim.field().is_occupied(victim));
    }

    #[test]
    fn test_pass_sees_pre_epoch_layout() {
        // Left mob moves right into the gap; right mob attacks left into the
        // same gap. The attack sees the gap as empty even though the move
        // was resolved first.
        let mut config = small_config();
        config.energy.population_penalty = 0.0;
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();

        let mut mover = vec![0.0; n];
        mover[n - 1 - 2] = 1.0;
        let mover = Brain::from_parts(vec![vec![0.0; n]; n], vec![1.0; n], mover).unwrap();
        let mut biter = vec![0.0; n];
        biter[n - 1 - 5] = 1.0;
        let biter = Brain::from_parts(vec![vec![0.0; n]; n], vec![1.0; n], biter).unwrap();

        sim.spawn(Mob::new(mover, 50.0, Position::new(1, 4)), Position::new(1, 4)).unwrap();
        sim.spawn(Mob::new(biter, 50.0, Position::new(3, 4)), Position::new(3, 4)).unwrap();

        let stats = sim.step();
        assert_eq!(stats.moves, 1);
        assert_eq!(stats.attacks, 1);
        assert_eq!(stats.hits, 0);
        assert!(sim.field().is_occupied(Position::new(2, 4)));
        assert!(!sim.field().is_occupied(Position::new(1, 4)));
        assert_field_consistent(&sim);
    }

    #[test]
    fn test_contested_cell_keeps_first_mover() {
        let mut config = small_config();
        config.energy.population_penalty = 0.0;
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();

        let brain_for = |index: usize| {
            let mut data = vec![0.0; n];
            data[n - 1 - index] = 1.0;
            Brain::from_parts(vec![vec![0.0; n]; n], vec![1.0; n], data).unwrap()
        };
        // Both target (2, 4): one moving right, one moving left.
        sim.spawn(Mob::new(brain_for(2), 50.0, Position::new(1, 4)), Position::new(1, 4))
            .unwrap();
        sim.spawn(Mob::new(brain_for(1), 60.0, Position::new(3, 4)), Position::new(3, 4))
            .unwrap();

        let stats = sim.step();
        assert_eq!(stats.rejected_insertions, 1);
        assert_eq!(sim.population(), 2);
        assert!(sim.field().is_occupied(Position::new(2, 4)));
        assert!(sim.field().is_occupied(Position::new(3, 4)));
        assert_field_consistent(&sim);
    }

    #[test]
    fn test_run_stops_on_extinction() {
        let config = small_config();
        let n = config.brain.size;
        let mut sim = Simulation::empty(config).unwrap();
        sim.spawn(Mob::new(attacker_right(n), 6.0, Position::new(2, 2)), Position::new(2, 2))
            .unwrap();
        let control = RunControl::new();
        let mut seen = 0;
        let summary = sim.run(100, &control, |_, _| seen += 1);
        assert_eq!(seen, 2);
        assert!(summary.extinct);
    }

    #[test]
    fn test_run_honours_stop() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let control = RunControl::new();
        control.request_stop();
        let summary = sim.run(10, &control, |_, _| {});
        assert_eq!(sim.epoch(), 0);
        assert_eq!(summary.epochs_run(), 0);
    }

    #[test]
    fn test_restore_rejects_wrong_brain_size() {
        let config = small_config();
        let mob = Mob::new(Brain::new(30), 5.0, Position::new(1, 1));
        assert!(matches!(
            Simulation::restore(config, 10, vec![mob]),
            Err(SimError::BrainShape(_))
        ));
    }
}
