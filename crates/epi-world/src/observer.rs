//! Publication boundary between the engine and its presentation layers.

use epi_core::{CellState, ChartHistory, ChartPoint, EpisodeSummary, SimulationId, SirCounts};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{event, info, Level};

/// Read-only snapshot of one simulation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub simulation_id: SimulationId,
    pub step: u64,
    pub grid_size: usize,
    /// Cell labels indexed by `row * grid_size + col`
    pub cells: Vec<CellState>,
    pub counts: SirCounts,
}

impl Frame {
    pub fn chart_point(&self) -> ChartPoint {
        ChartPoint::new(self.step, self.counts)
    }

    /// Label rows, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> + '_ {
        self.cells.chunks(self.grid_size.max(1))
    }
}

/// Receives every published frame
pub trait Observer: Send {
    /// Called after each completed step.
    fn on_frame(&mut self, frame: &Frame);

    /// Called with the fresh state after a reset.
    fn on_reset(&mut self, frame: &Frame) {
        self.on_frame(frame);
    }
}

/// Collects the chart series for the current episode.
///
/// The history is shared so that the owner of the driver can read it while
/// the recorder itself is held by the driver.
#[derive(Debug, Clone, Default)]
pub struct ChartRecorder {
    history: Arc<Mutex<ChartHistory>>,
}

impl ChartRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Arc<Mutex<ChartHistory>> {
        self.history.clone()
    }

    pub fn snapshot(&self) -> ChartHistory {
        self.history.lock().clone()
    }
}

impl Observer for ChartRecorder {
    fn on_frame(&mut self, frame: &Frame) {
        self.history.lock().push(frame.chart_point());
    }

    fn on_reset(&mut self, _frame: &Frame) {
        self.history.lock().clear();
    }
}

/// Tracks the running episode and logs its summary once the infection dies out
#[derive(Debug, Default)]
pub struct EpisodeLogger {
    history: ChartHistory,
    last_summary: Option<EpisodeSummary>,
}

impl EpisodeLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_summary(&self) -> Option<&EpisodeSummary> {
        self.last_summary.as_ref()
    }

    fn emit_episode_summary(&mut self, frame: &Frame) {
        let Some(summary) = self.history.summary() else {
            return;
        };

        info!(
            event = "episode_summary",
            simulation_id = %frame.simulation_id,
            total_steps = summary.total_steps,
            peak_infected = summary.peak_infected,
            peak_step = summary.peak_step,
            final_susceptible = summary.final_susceptible,
            final_recovered = summary.final_recovered,
            attack_rate = format!("{:.1}%", summary.attack_rate * 100.0),
            "Epidemic over"
        );

        event!(
            Level::INFO,
            histogram_name = "episode_duration",
            histogram_value = summary.total_steps,
            "Episode duration histogram"
        );

        self.last_summary = Some(summary);
    }
}

impl Observer for EpisodeLogger {
    fn on_frame(&mut self, frame: &Frame) {
        self.history.push(frame.chart_point());
        if frame.counts.infected == 0 && self.last_summary.is_none() {
            self.emit_episode_summary(frame);
        }
    }

    fn on_reset(&mut self, _frame: &Frame) {
        self.history.clear();
        self.last_summary = None;
    }
}
