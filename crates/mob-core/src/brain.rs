//! Brain
//!
//! A fixed-size recurrent network that is both a mob's controller and its
//! genome. Every unit holds one activation; each evaluation overwrites the
//! head of the activation vector with sensed input and then relaxes the
//! units one by one, from the last index down to the first.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Recurrent weighted-average network.
///
/// Serializes as `n`, the `n x n` connection matrix, the memory strength
/// vector and the activation vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    n: usize,
    /// `connections[i][j]` is the weight of unit `j` in unit `i`'s average
    connections: Vec<Vec<f64>>,
    memory_strength: Vec<f64>,
    data: Vec<f64>,
}

impl Brain {
    /// Fresh brain: uniform 0.5 weights and retention, silent activations.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            connections: vec![vec![0.5; n]; n],
            memory_strength: vec![0.5; n],
            data: vec![0.0; n],
        }
    }

    /// Builds a brain from raw parts, e.g. when loading a checkpoint.
    ///
    /// Returns `None` if the parts disagree on `n`.
    pub fn from_parts(
        connections: Vec<Vec<f64>>,
        memory_strength: Vec<f64>,
        data: Vec<f64>,
    ) -> Option<Self> {
        let n = data.len();
        if memory_strength.len() != n
            || connections.len() != n
            || connections.iter().any(|row| row.len() != n)
        {
            return None;
        }
        Some(Self {
            n,
            connections,
            memory_strength,
            data,
        })
    }

    pub fn size(&self) -> usize {
        self.n
    }

    /// True if every vector and matrix row has length `n`.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.n
            && self.memory_strength.len() == self.n
            && self.connections.len() == self.n
            && self.connections.iter().all(|row| row.len() == self.n)
    }

    pub fn connections(&self) -> &[Vec<f64>] {
        &self.connections
    }

    pub fn memory_strength(&self) -> &[f64] {
        &self.memory_strength
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Runs one relaxation pass and returns the activations.
    ///
    /// Units update from `n - 1` down to `0`, each reading the activations
    /// as they stand at that moment, so low units see the already updated
    /// high units. A connection row summing to zero contributes an average
    /// of zero.
    ///
    /// # Panics
    ///
    /// Panics if `input` is not strictly shorter than the brain.
    pub fn evaluate(&mut self, input: &[f64]) -> &[f64] {
        assert!(
            input.len() < self.n,
            "brain of size {} cannot take {} inputs",
            self.n,
            input.len()
        );
        self.data[..input.len()].copy_from_slice(input);

        for i in (0..self.n).rev() {
            let row = &self.connections[i];
            let (sum, weight_sum) = row
                .iter()
                .zip(&self.data)
                .fold((0.0, 0.0), |(sum, wsum), (w, d)| (sum + d * w, wsum + w));
            let average = if weight_sum == 0.0 { 0.0 } else { sum / weight_sum };
            let q = self.memory_strength[i];
            self.data[i] = self.data[i] * q + average * (1.0 - q);
        }

        &self.data
    }

    /// Returns an offspring brain with every scalar jittered.
    ///
    /// Each value is perturbed with chance `probability` by a uniform draw
    /// from `[-intensity, intensity]` and clamped back into `[0, 1]`.
    /// Negative or NaN intensity counts as zero.
    pub fn mutated_copy<R: Rng + ?Sized>(&self, intensity: f64, probability: f64, rng: &mut R) -> Self {
        let intensity = intensity.max(0.0);
        let mut mutate = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .map(|&v| {
                    if rng.gen::<f64>() >= probability {
                        return v;
                    }
                    // 0 * inf is NaN: the value is left alone then.
                    let shifted = v + rng.gen_range(-1.0f64..=1.0) * intensity;
                    if shifted.is_nan() {
                        v
                    } else {
                        shifted.clamp(0.0, 1.0)
                    }
                })
                .collect()
        };

        let connections: Vec<Vec<f64>> = self.connections.iter().map(|row| mutate(row)).collect();
        let memory_strength = mutate(&self.memory_strength);
        let data = mutate(&self.data);

        Self {
            n: self.n,
            connections,
            memory_strength,
            data,
        }
    }

    /// Largest absolute difference to `other` over every scalar.
    pub fn max_deviation(&self, other: &Brain) -> f64 {
        let rows = self
            .connections
            .iter()
            .zip(&other.connections)
            .flat_map(|(a, b)| a.iter().zip(b));
        rows.chain(self.memory_strength.iter().zip(&other.memory_strength))
            .chain(self.data.iter().zip(&other.data))
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
