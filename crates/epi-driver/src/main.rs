//! Terminal front end for the SIR grid simulator.

mod console;
mod driver;
mod render;
mod telemetry;

use anyhow::Result;
use epi_core::DriverConfig;
use epi_world::{ChartRecorder, EpisodeLogger, Observer};
use tokio::io::BufReader;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = DriverConfig::from_env()?;

    telemetry::init_telemetry(config.log_format)?;

    info!(
        population = %config.sim.population,
        infection_rate = config.sim.population.infection_rate().value(),
        grid_size = config.sim.grid_size,
        cadence_ms = config.cadence_ms,
        "Starting Epi-Grid"
    );

    let recorder = ChartRecorder::new();
    let chart = recorder.history();

    let observers: Vec<Box<dyn Observer>> = vec![
        Box::new(render::TerminalRenderer::stdout()),
        Box::new(recorder),
        Box::new(EpisodeLogger::new()),
    ];

    let (handle, driver_task) = driver::spawn(&config, observers)?;

    if config.autostart {
        handle.start().await?;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = console::run(handle.clone(), stdin) => {
            if let Err(e) = result {
                error!("Console failed: {}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    handle.shutdown();
    driver_task.await?;

    let chart = chart.lock().clone();
    println!("{}", serde_json::to_string_pretty(&chart)?);

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
