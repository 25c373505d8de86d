//! Environment Model
//!
//! Sunlight, food and radiation as pure functions of depth and epoch.
//! Nothing here tracks consumption: every cell yields the same energy to
//! every mob that produces on it during an epoch.

use std::f64::consts::PI;

use crate::config::Config;

/// Depth gradients resolved against a concrete field height.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    height: f64,
    earn: f64,
    at_bottom: f64,
    radiation_top: f64,
    radiation_bottom: f64,
    foodgrad_top: f64,
    foodgrad_bottom: f64,
    food_energy_earn: f64,
    season_length: f64,
    global_starvation_level: f64,
}

impl Environment {
    pub fn new(config: &Config) -> Self {
        Self {
            height: f64::from(config.field.height),
            earn: config.energy.earn,
            at_bottom: config.energy.at_bottom,
            radiation_top: config.environment.radiation_top,
            radiation_bottom: config.environment.radiation_bottom,
            foodgrad_top: config.environment.foodgrad_top,
            foodgrad_bottom: config.environment.foodgrad_bottom,
            food_energy_earn: config.environment.food_energy_earn,
            season_length: config.environment.season_length as f64,
            global_starvation_level: config.environment.global_starvation_level,
        }
    }

    fn depth(&self, y: i32) -> f64 {
        f64::from(y) / self.height
    }

    /// Sun multiplier for `epoch`; period is twice the season length.
    pub fn sun_strength(&self, epoch: u64) -> f64 {
        (epoch as f64 * PI / self.season_length).sin() + 1.0 - self.global_starvation_level
    }

    /// Sun strength mapped onto [0, 1] for gauges.
    pub fn sun_gauge(&self, epoch: u64) -> f64 {
        (self.sun_strength(epoch) + self.global_starvation_level) / 2.0
    }

    /// Sunlight share of the yield at row `y`.
    pub fn sun_energy(&self, y: i32, epoch: u64) -> f64 {
        self.earn * ((1.0 + self.at_bottom) - self.depth(y)) * self.sun_strength(epoch)
    }

    /// Food share of the yield at row `y`; zero above the food line.
    pub fn food_energy(&self, y: i32) -> f64 {
        let k = (self.depth(y) - self.foodgrad_top) / (self.foodgrad_bottom - self.foodgrad_top);
        (k * self.food_energy_earn).max(0.0)
    }

    /// Energy a mob gains by producing at row `y` during `epoch`.
    pub fn cell_energy(&self, y: i32, epoch: u64) -> f64 {
        self.sun_energy(y, epoch) + self.food_energy(y)
    }

    /// Mutation intensity at row `y`.
    pub fn radiation(&self, y: i32) -> f64 {
        let k = self.depth(y);
        k * self.radiation_bottom + (1.0 - k) * self.radiation_top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> (Environment, Config) {
        let config = Config::default();
        (Environment::new(&config), config)
    }

    #[test]
    fn test_sun_strength_baseline() {
        let (env, _) = env();
        assert!((env.sun_strength(0) - 0.95).abs() < 1e-12);
        assert!((env.sun_strength(2000) - 1.95).abs() < 1e-9);
        assert!((env.sun_strength(6000) + 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_sun_strength_periodic() {
        let (env, config) = env();
        let period = config.environment.season_length * 2;
        for epoch in [0, 17, 1234, 3999, 5555] {
            let a = env.sun_strength(epoch);
            let b = env.sun_strength(epoch + period);
            assert!((a - b).abs() < 1e-9, "epoch {epoch}: {a} vs {b}");
        }
    }

    #[test]
    fn test_sun_strength_symmetric_about_peak() {
        let (env, config) = env();
        let half = config.environment.season_length / 2;
        for offset in [1, 100, 1500, 2000] {
            let before = env.sun_strength(half - offset);
            let after = env.sun_strength(half + offset);
            assert!((before - after).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sun_gauge_bounds() {
        let (env, _) = env();
        for epoch in (0..8000).step_by(250) {
            let gauge = env.sun_gauge(epoch);
            assert!((0.0..=1.0 + 1e-12).contains(&gauge));
        }
    }

    #[test]
    fn test_sun_energy_non_increasing_with_depth() {
        let (env, config) = env();
        for epoch in (0..8000).step_by(250) {
            if env.sun_strength(epoch) < 0.0 {
                continue;
            }
            let mut previous = f64::INFINITY;
            for y in 0..config.field.height as i32 {
                let e = env.sun_energy(y, epoch);
                assert!(e <= previous + 1e-12, "epoch {epoch}, row {y}");
                previous = e;
            }
        }
    }

    #[test]
    fn test_sun_energy_flips_sign_at_trough() {
        let (env, config) = env();
        // sin bottoms out at 1.5 seasons, leaving -global_starvation_level.
        let trough = config.environment.season_length * 3 / 2;
        assert!(env.sun_strength(trough) < 0.0);

        let mut previous = f64::NEG_INFINITY;
        for y in 0..config.field.height as i32 {
            let e = env.sun_energy(y, trough);
            assert!(e < 0.0, "row {y} earns {e}");
            assert!(e >= previous - 1e-12, "row {y} drains more than the row above");
            previous = e;
        }
    }

    #[test]
    fn test_cell_energy_non_negative_above_food_line() {
        let (env, config) = env();
        let height = config.field.height as i32;
        for epoch in (0..8000).step_by(97) {
            for y in 0..height {
                if f64::from(y) / f64::from(config.field.height) < config.environment.foodgrad_top {
                    assert_eq!(env.food_energy(y), 0.0);
                    assert_eq!(env.cell_energy(y, epoch), env.sun_energy(y, epoch));
                    // The trough dips below zero by the starvation level.
                    if env.sun_strength(epoch) >= 0.0 {
                        assert!(env.cell_energy(y, epoch) >= 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_food_appears_below_threshold() {
        let (env, _) = env();
        assert_eq!(env.food_energy(0), 0.0);
        assert_eq!(env.food_energy(27), 0.0);
        assert!(env.food_energy(30) > 0.0);
        assert!(env.food_energy(49) > env.food_energy(30));
    }

    #[test]
    fn test_radiation_interpolates() {
        let (env, _) = env();
        assert!((env.radiation(0) - 0.2).abs() < 1e-12);
        assert!((env.radiation(25) - 0.5).abs() < 1e-12);
        assert!(env.radiation(49) < 0.8);
        assert!(env.radiation(49) > env.radiation(48));
    }
}
