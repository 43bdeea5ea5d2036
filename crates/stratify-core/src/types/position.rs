//! Position type.

use serde::{Deserialize, Serialize};

/// Units held in a single instrument.
///
/// Units are unsigned: a position can be flat but never short.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument identifier
    pub instrument: String,
    /// Units held
    pub units: u64,
}

impl Position {
    /// Create a flat position.
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            units: 0,
        }
    }

    /// Market value at `price`.
    pub fn value_at(&self, price: f64) -> f64 {
        price * self.units as f64
    }

    /// Add bought units.
    pub fn increase(&mut self, units: u64) {
        self.units += units;
    }

    /// Remove sold units, never going below zero. Returns the units removed.
    pub fn decrease(&mut self, units: u64) -> u64 {
        let removed = units.min(self.units);
        self.units -= removed;
        removed
    }
}
