//! SIR grid engine.
//!
//! This module implements the 2D grid where cells catch, carry, and recover
//! from an infection, along with the simulation state that steps it and the
//! observer boundary that publishes each step.

pub mod grid;
pub mod simulation;
pub mod observer;

pub use grid::Grid;
pub use simulation::{Simulation, TickOutcome};
pub use observer::{ChartRecorder, EpisodeLogger, Frame, Observer};
