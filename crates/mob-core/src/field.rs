//! Field
//!
//! The authoritative grid of live mobs. Mobs are keyed by their cell; x
//! wraps around (the field is a cylinder) and y is bounded.
//!
//! Structural changes during an epoch never touch the grid directly. They
//! are queued in [`PendingChanges`] and applied together by
//! [`Field::commit`], so every occupancy query made during the pass sees
//! the field as it stood when the epoch began.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::agent::Mob;

/// A grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the eight cells around a mob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbor {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Neighbor {
    /// Fixed sensing order. North is towards row 0.
    pub const ALL: [Neighbor; 8] = [
        Neighbor::North,
        Neighbor::NorthEast,
        Neighbor::East,
        Neighbor::SouthEast,
        Neighbor::South,
        Neighbor::SouthWest,
        Neighbor::West,
        Neighbor::NorthWest,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Neighbor::North => (0, -1),
            Neighbor::NorthEast => (1, -1),
            Neighbor::East => (1, 0),
            Neighbor::SouthEast => (1, 1),
            Neighbor::South => (0, 1),
            Neighbor::SouthWest => (-1, 1),
            Neighbor::West => (-1, 0),
            Neighbor::NorthWest => (-1, -1),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("cell {0} is already occupied")]
    Occupied(Position),
    #[error("cell {0} lies outside the {1}x{2} field")]
    OutOfBounds(Position, u32, u32),
}

/// What a staged insertion carries into its target cell.
#[derive(Debug, Clone)]
pub enum Arrival {
    /// A mob already on the field, lifted from `from` at commit time
    Relocate { from: Position },
    /// A newborn
    Spawn(Mob),
}

/// Structural changes queued during one epoch.
#[derive(Debug, Default)]
pub struct PendingChanges {
    removals: Vec<Position>,
    insertions: Vec<(Position, Arrival)>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue removal of whatever occupies `pos`.
    pub fn remove(&mut self, pos: Position) {
        self.removals.push(pos);
    }

    /// Queue a move from `from` to `to`.
    pub fn relocate(&mut self, from: Position, to: Position) {
        self.removals.push(from);
        self.insertions.push((to, Arrival::Relocate { from }));
    }

    /// Queue a newborn at `at`.
    pub fn spawn(&mut self, at: Position, mob: Mob) {
        self.insertions.push((at, Arrival::Spawn(mob)));
    }

    pub fn removals(&self) -> &[Position] {
        &self.removals
    }

    pub fn insertions(&self) -> &[(Position, Arrival)] {
        &self.insertions
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.insertions.is_empty()
    }
}

/// What a commit actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub removed: usize,
    pub relocated: usize,
    pub spawned: usize,
    /// Relocations that found their target taken and stayed put
    pub bounced: usize,
    /// Newborns that found their target taken and were dropped
    pub discarded: usize,
    /// Relocations that found both their target and their origin taken
    pub lost: usize,
}

impl CommitReport {
    pub fn rejected(&self) -> usize {
        self.bounced + self.discarded + self.lost
    }
}

/// Sparse cylindrical grid of mobs.
#[derive(Debug, Clone)]
pub struct Field {
    width: u32,
    height: u32,
    cells: BTreeMap<Position, Mob>,
}

impl Field {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn center(&self) -> Position {
        Position::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && (pos.x as u32) < self.width && pos.y >= 0 && (pos.y as u32) < self.height
    }

    /// Target of a step by (dx, dy): x wraps, y clamps to the field.
    pub fn offset(&self, pos: Position, dx: i32, dy: i32) -> Position {
        let width = self.width as i32;
        let x = (pos.x + dx).rem_euclid(width);
        let y = (pos.y + dy).clamp(0, self.height as i32 - 1);
        Position::new(x, y)
    }

    /// Adjacent cell in direction `dir`, or `None` past the top or bottom row.
    pub fn neighbor(&self, pos: Position, dir: Neighbor) -> Option<Position> {
        let (dx, dy) = dir.delta();
        let y = pos.y + dy;
        if y < 0 || y >= self.height as i32 {
            return None;
        }
        Some(Position::new((pos.x + dx).rem_euclid(self.width as i32), y))
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Occupancy of the eight neighbours in [`Neighbor::ALL`] order.
    pub fn neighbor_occupancy(&self, pos: Position) -> [bool; 8] {
        Neighbor::ALL.map(|dir| self.neighbor(pos, dir).is_some_and(|p| self.is_occupied(p)))
    }

    pub fn occupied_neighbors(&self, pos: Position) -> usize {
        self.neighbor_occupancy(pos).iter().filter(|&&o| o).count()
    }

    /// In-bounds neighbours of `pos` with nobody in them.
    pub fn free_neighbors(&self, pos: Position) -> Vec<Position> {
        Neighbor::ALL
            .iter()
            .filter_map(|&dir| self.neighbor(pos, dir))
            .filter(|p| !self.is_occupied(*p))
            .collect()
    }

    pub fn get(&self, pos: Position) -> Option<&Mob> {
        self.cells.get(&pos)
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Mob> {
        self.cells.get_mut(&pos)
    }

    /// Occupied cells in visiting order.
    pub fn positions(&self) -> Vec<Position> {
        self.cells.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Position, &Mob)> {
        self.cells.iter()
    }

    pub fn mobs(&self) -> impl Iterator<Item = &Mob> {
        self.cells.values()
    }

    pub fn total_energy(&self) -> f64 {
        self.cells.values().map(|m| m.energy).sum()
    }

    /// Puts `mob` on the field at its own position, outside of any epoch.
    pub fn place(&mut self, mut mob: Mob, at: Position) -> Result<(), FieldError> {
        if !self.contains(at) {
            return Err(FieldError::OutOfBounds(at, self.width, self.height));
        }
        if self.is_occupied(at) {
            return Err(FieldError::Occupied(at));
        }
        mob.position = at;
        self.cells.insert(at, mob);
        Ok(())
    }

    /// Takes a bite out of the mob at `target`.
    ///
    /// The victim loses `min(victim.energy, max_bite)` and that amount is
    /// returned. An empty cell yields nothing.
    pub fn bite(&mut self, target: Position, max_bite: f64) -> f64 {
        match self.cells.get_mut(&target) {
            Some(victim) => {
                if victim.energy < max_bite {
                    let taken = victim.energy;
                    victim.energy = 0.0;
                    taken
                } else {
                    victim.energy -= max_bite;
                    max_bite
                }
            }
            None => 0.0,
        }
    }

    /// Applies queued changes.
    ///
    /// Relocating mobs are lifted off their origin cells first, then queued
    /// removals are applied (removing an empty cell is a no-op), then
    /// insertions land in queue order. The first insertion into a cell wins:
    /// a later relocation into it falls back to its origin, a later newborn
    /// is dropped.
    pub fn commit(&mut self, changes: PendingChanges) -> CommitReport {
        let mut report = CommitReport::default();
        let PendingChanges {
            removals,
            insertions,
        } = changes;

        let mut arrivals = Vec::with_capacity(insertions.len());
        for (to, arrival) in insertions {
            match arrival {
                Arrival::Relocate { from } => match self.cells.remove(&from) {
                    Some(mob) => arrivals.push((to, mob, Some(from))),
                    None => tracing::warn!("relocation from empty cell {}", from),
                },
                Arrival::Spawn(mob) => arrivals.push((to, mob, None)),
            }
        }

        for pos in removals {
            if self.cells.remove(&pos).is_some() {
                report.removed += 1;
            }
        }

        for (to, mut mob, origin) in arrivals {
            if !self.is_occupied(to) {
                mob.position = to;
                self.cells.insert(to, mob);
                match origin {
                    Some(_) => report.relocated += 1,
                    None => report.spawned += 1,
                }
                continue;
            }
            match origin {
                Some(from) if !self.is_occupied(from) => {
                    tracing::debug!("move {} -> {} lost the cell, staying put", from, to);
                    mob.position = from;
                    self.cells.insert(from, mob);
                    report.bounced += 1;
                }
                Some(from) => {
                    tracing::warn!(
                        "move {} -> {} lost the cell and its origin is taken, mob dropped",
                        from,
                        to
                    );
                    report.lost += 1;
                }
                None => {
                    tracing::debug!("arrival at {} dropped, cell already taken", to);
                    report.discarded += 1;
                }
            }
        }

        report
    }
}
