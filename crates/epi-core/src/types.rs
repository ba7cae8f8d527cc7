//! Core type definitions for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a simulation instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationId(pub Uuid);

impl SimulationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SimulationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Epidemiological label of a cell, as seen by renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Susceptible,
    Infected,
    Recovered,
}

impl CellState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellState::Susceptible => "susceptible",
            CellState::Infected => "infected",
            CellState::Recovered => "recovered",
        }
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single agent on the grid.
///
/// The infection age only exists while the cell is infected; it counts the
/// steps elapsed since infection, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Susceptible,
    Infected { age: u32 },
    Recovered,
}

impl Cell {
    /// A freshly infected cell
    pub fn infected() -> Self {
        Cell::Infected { age: 1 }
    }

    pub fn state(&self) -> CellState {
        match self {
            Cell::Susceptible => CellState::Susceptible,
            Cell::Infected { .. } => CellState::Infected,
            Cell::Recovered => CellState::Recovered,
        }
    }

    /// Steps since infection; 0 for any non-infected cell
    pub fn infection_age(&self) -> u32 {
        match self {
            Cell::Infected { age } => *age,
            _ => 0,
        }
    }

    pub fn is_infected(&self) -> bool {
        matches!(self, Cell::Infected { .. })
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Susceptible
    }
}

/// Per-step probability that an exposed susceptible cell becomes infected
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct InfectionRate(f64);

impl InfectionRate {
    pub const ZERO: InfectionRate = InfectionRate(0.0);
    pub const CERTAIN: InfectionRate = InfectionRate(1.0);

    /// Build a rate, rejecting values outside `[0, 1]`
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(Error::Validation(format!(
                "infection rate must be within [0, 1], got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Build a rate, clamping into `[0, 1]` (NaN becomes 0)
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for InfectionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
