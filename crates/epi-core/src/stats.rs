//! SIR counts and time-series tracking.

use crate::CellState;
use serde::{Deserialize, Serialize};

/// Offset of the cosmetic trend line above the infected count
pub const NAIVE_TREND_OFFSET: usize = 5;

/// Number of cells in each compartment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SirCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl SirCounts {
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = CellState>,
    {
        let mut counts = Self::default();
        for state in states {
            counts.record(state);
        }
        counts
    }

    pub fn record(&mut self, state: CellState) {
        match state {
            CellState::Susceptible => self.susceptible += 1,
            CellState::Infected => self.infected += 1,
            CellState::Recovered => self.recovered += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.recovered
    }
}

/// One sample of the chart time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub step: u64,
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
    /// `infected + 5`. Decorative only: it has no modeling basis and must
    /// not be read as a forecast.
    pub naive_trend: usize,
}

impl ChartPoint {
    pub fn new(step: u64, counts: SirCounts) -> Self {
        Self {
            step,
            susceptible: counts.susceptible,
            infected: counts.infected,
            recovered: counts.recovered,
            naive_trend: counts.infected + NAIVE_TREND_OFFSET,
        }
    }
}

/// Accumulated chart series for one episode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartHistory {
    pub points: Vec<ChartPoint>,
}

impl ChartHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: ChartPoint) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&ChartPoint> {
        self.points.last()
    }

    /// Summarize the episode recorded so far
    pub fn summary(&self) -> Option<EpisodeSummary> {
        let last = self.points.last()?;
        let peak = self
            .points
            .iter()
            .max_by(|a, b| a.infected.cmp(&b.infected).then(b.step.cmp(&a.step)))?;

        let population = last.susceptible + last.infected + last.recovered;
        let attack_rate = if population > 0 {
            last.recovered as f64 / population as f64
        } else {
            0.0
        };

        Some(EpisodeSummary {
            total_steps: last.step,
            peak_infected: peak.infected,
            peak_step: peak.step,
            final_susceptible: last.susceptible,
            final_infected: last.infected,
            final_recovered: last.recovered,
            attack_rate,
        })
    }
}

/// End-of-episode statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub total_steps: u64,
    pub peak_infected: usize,
    /// First step at which the peak was reached
    pub peak_step: u64,
    pub final_susceptible: usize,
    pub final_infected: usize,
    pub final_recovered: usize,
    /// Share of the population that ended up recovered
    pub attack_rate: f64,
}
