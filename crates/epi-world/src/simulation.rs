//! Simulation state: the grid, its clock, and the random source stepping it.

use crate::grid::Grid;
use crate::observer::Frame;
use epi_core::{PopulationType, Result, SimConfig, SimulationId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, event, info, trace, Level};

/// Result of advancing the simulation by one step
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub frame: Frame,
    /// No infected cell remains; the episode is over
    pub extinct: bool,
}

pub struct Simulation<R = ChaCha8Rng> {
    id: SimulationId,
    grid: Grid,
    grid_size: usize,
    population: PopulationType,
    rng: R,
    tick: u64,
}

impl Simulation<ChaCha8Rng> {
    /// Create a simulation, seeding from the config or from OS entropy
    pub fn new(config: &SimConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(config: &SimConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let id = SimulationId::new();
        info!(
            simulation_id = %id,
            grid_size = config.grid_size,
            population = %config.population,
            seeded = config.seed.is_some(),
            "Simulation created"
        );

        Ok(Self {
            id,
            grid: Grid::new(config.grid_size),
            grid_size: config.grid_size,
            population: config.population,
            rng,
            tick: 0,
        })
    }

    pub fn id(&self) -> SimulationId {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn population(&self) -> PopulationType {
        self.population
    }

    /// Change the preset; applies from the next step on
    pub fn set_population(&mut self, population: PopulationType) {
        if population != self.population {
            info!(
                simulation_id = %self.id,
                from = %self.population,
                to = %population,
                tick = self.tick,
                "Population type changed"
            );
            self.population = population;
        }
    }

    /// Execute one simulation step
    pub fn advance(&mut self) -> TickOutcome {
        let rate = self.population.infection_rate();
        self.grid = self.grid.step(rate, &mut self.rng);
        self.tick += 1;

        let frame = self.frame();
        let extinct = self.grid.is_extinct();

        trace!(
            simulation_id = %self.id,
            tick = self.tick,
            infection_rate = rate.value(),
            "Step computed"
        );

        event!(
            Level::DEBUG,
            gauge_name = "infected",
            gauge_value = frame.counts.infected,
            susceptible = frame.counts.susceptible,
            recovered = frame.counts.recovered,
            tick = self.tick,
            "SIR counts"
        );

        if extinct {
            debug!(simulation_id = %self.id, tick = self.tick, "No infected cells remain");
        }

        TickOutcome { frame, extinct }
    }

    /// Discard the grid and restart the clock
    pub fn reset(&mut self) {
        self.grid = Grid::new(self.grid_size);
        self.tick = 0;
        info!(simulation_id = %self.id, "Simulation reset");
    }

    /// Snapshot of the current state
    pub fn frame(&self) -> Frame {
        Frame {
            simulation_id: self.id,
            step: self.tick,
            grid_size: self.grid.size(),
            cells: self.grid.labels(),
            counts: self.grid.counts(),
        }
    }

    pub fn is_extinct(&self) -> bool {
        self.grid.is_extinct()
    }
}
