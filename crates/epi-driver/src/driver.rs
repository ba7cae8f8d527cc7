//! Simulation driver: lifecycle and cadence around a single simulation.
//!
//! The driver runs as one tokio task. Commands arrive over a channel from
//! any number of [`DriverHandle`] clones; steps are paced by a [`Cadence`].
//! Each step runs to completion (grid, clock, observers) before the next
//! command or tick is looked at.

use epi_core::{DriverConfig, Error, PopulationType, Result, SirCounts};
use epi_world::{Observer, Simulation};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
}

/// Externally visible driver state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverStatus {
    pub run_state: RunState,
    pub clock: u64,
    pub counts: SirCounts,
}

#[derive(Debug)]
enum Command {
    Start,
    Stop,
    Reset,
    SetPopulation(PopulationType),
    Status(oneshot::Sender<DriverStatus>),
}

/// Fixed-period trigger that can be started and cancelled.
///
/// While inactive, [`Cadence::tick`] never resolves.
pub struct Cadence {
    period: Duration,
    interval: Option<Interval>,
}

impl Cadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// First tick fires one full period from now
    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn cancel(&mut self) {
        self.interval = None;
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

pub struct Driver<R = ChaCha8Rng> {
    sim: Simulation<R>,
    run_state: RunState,
    cadence: Cadence,
    observers: Vec<Box<dyn Observer>>,
    status: watch::Sender<DriverStatus>,
}

impl<R: Rng> Driver<R> {
    pub fn new(
        sim: Simulation<R>,
        period: Duration,
        observers: Vec<Box<dyn Observer>>,
    ) -> (Self, watch::Receiver<DriverStatus>) {
        let initial = DriverStatus {
            run_state: RunState::Idle,
            clock: sim.tick(),
            counts: sim.grid().counts(),
        };
        let (status, status_rx) = watch::channel(initial);

        let driver = Self {
            sim,
            run_state: RunState::Idle,
            cadence: Cadence::new(period),
            observers,
            status,
        };
        (driver, status_rx)
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn simulation(&self) -> &Simulation<R> {
        &self.sim
    }

    pub fn current_status(&self) -> DriverStatus {
        DriverStatus {
            run_state: self.run_state,
            clock: self.sim.tick(),
            counts: self.sim.grid().counts(),
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(self.current_status());
    }

    #[instrument(skip(self), fields(simulation_id = %self.sim.id()))]
    pub fn start(&mut self) {
        if self.run_state == RunState::Running {
            debug!("Already running");
            return;
        }

        self.run_state = RunState::Running;
        self.cadence.start();
        info!(
            clock = self.sim.tick(),
            cadence_ms = self.cadence.period().as_millis() as u64,
            population = %self.sim.population(),
            "Simulation started"
        );
        self.publish_status();
    }

    #[instrument(skip(self), fields(simulation_id = %self.sim.id()))]
    pub fn stop(&mut self) {
        self.cadence.cancel();
        if self.run_state == RunState::Running {
            self.run_state = RunState::Idle;
            info!(clock = self.sim.tick(), "Simulation stopped");
            self.publish_status();
        }
    }

    #[instrument(skip(self), fields(simulation_id = %self.sim.id()))]
    pub fn reset(&mut self) {
        self.stop();
        self.sim.reset();

        let frame = self.sim.frame();
        for observer in &mut self.observers {
            observer.on_reset(&frame);
        }
        self.publish_status();
    }

    pub fn set_population(&mut self, population: PopulationType) {
        self.sim.set_population(population);
    }

    /// Advance one step if running; returns whether a step was taken
    pub fn on_tick(&mut self) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }

        let outcome = self.sim.advance();
        for observer in &mut self.observers {
            observer.on_frame(&outcome.frame);
        }

        if outcome.extinct {
            self.cadence.cancel();
            self.run_state = RunState::Idle;
            info!(
                event = "simulation_halted",
                simulation_id = %self.sim.id(),
                clock = outcome.frame.step,
                recovered = outcome.frame.counts.recovered,
                "Infection extinct, halting"
            );
        }

        self.publish_status();
        true
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Reset => self.reset(),
            Command::SetPopulation(population) => self.set_population(population),
            Command::Status(reply) => {
                let _ = reply.send(self.current_status());
            }
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, shutdown: CancellationToken) {
        info!(simulation_id = %self.sim.id(), "Driver task started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = self.cadence.tick() => {
                    self.on_tick();
                }
            }
        }

        self.cadence.cancel();
        info!(simulation_id = %self.sim.id(), clock = self.sim.tick(), "Driver task stopped");
    }
}

/// Cloneable control surface for a spawned driver
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<DriverStatus>,
    shutdown: CancellationToken,
}

impl DriverHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::InvalidState("driver is not running".to_string()))
    }

    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    pub async fn set_population(&self, population: PopulationType) -> Result<()> {
        self.send(Command::SetPopulation(population)).await
    }

    /// Status after every previously sent command has been applied
    pub async fn current_status(&self) -> Result<DriverStatus> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Status(reply)).await?;
        response
            .await
            .map_err(|_| Error::InvalidState("driver dropped status request".to_string()))
    }

    /// Wait until a published status satisfies `predicate`
    pub async fn wait_for<F>(&self, predicate: F) -> Result<DriverStatus>
    where
        F: FnMut(&DriverStatus) -> bool,
    {
        let mut status = self.status.clone();
        let found = status
            .wait_for(predicate)
            .await
            .map_err(|_| Error::InvalidState("driver is not running".to_string()))?;
        Ok(found.clone())
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Build the simulation described by `config` and run its driver on a new task
pub fn spawn(
    config: &DriverConfig,
    observers: Vec<Box<dyn Observer>>,
) -> Result<(DriverHandle, JoinHandle<()>)> {
    config.validate()?;
    let sim = Simulation::new(&config.sim)?;
    let period = Duration::from_millis(config.cadence_ms);
    Ok(spawn_driver(sim, period, observers))
}

pub fn spawn_driver<R>(
    sim: Simulation<R>,
    period: Duration,
    observers: Vec<Box<dyn Observer>>,
) -> (DriverHandle, JoinHandle<()>)
where
    R: Rng + Send + 'static,
{
    let (driver, status) = Driver::new(sim, period, observers);
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let shutdown = CancellationToken::new();

    let task = tokio::spawn(driver.run(rx, shutdown.clone()));

    let handle = DriverHandle {
        commands,
        status,
        shutdown,
    };
    (handle, task)
}
