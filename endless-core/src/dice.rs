//! Random draws used by combat.
//!
//! The only random event in the engine is the escape roll: a single uniform
//! draw in `[1, 100]`. Combat takes the source as a parameter so tests can
//! script exact rolls.

use rand::Rng;
use std::collections::VecDeque;

/// A source of percentile rolls.
pub trait RollSource {
    /// Roll a d100: a uniform value in `[1, 100]`.
    fn roll_percent(&mut self) -> u32;
}

/// Roll source backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRoller<R> {
    rng: R,
}

impl<R: Rng> RngRoller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RollSource for RngRoller<R> {
    fn roll_percent(&mut self) -> u32 {
        self.rng.gen_range(1..=100)
    }
}

/// Scripted rolls, returned in order. Once exhausted every roll is 100,
/// the worst possible escape roll.
#[derive(Debug, Clone, Default)]
pub struct FixedRolls {
    rolls: VecDeque<u32>,
}

impl FixedRolls {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RollSource for FixedRolls {
    fn roll_percent(&mut self) -> u32 {
        self.rolls.pop_front().unwrap_or(100).clamp(1, 100)
    }
}
