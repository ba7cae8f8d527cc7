//! Line-oriented control console.

use crate::driver::{DriverHandle, RunState};
use anyhow::Result;
use epi_core::{Error, PopulationType};
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Reset,
    Population(PopulationType),
    Status,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = Error;

    fn from_str(s: &str) -> epi_core::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(ConsoleCommand::Start),
            "stop" => Ok(ConsoleCommand::Stop),
            "reset" => Ok(ConsoleCommand::Reset),
            "urban" => Ok(ConsoleCommand::Population(PopulationType::Urban)),
            "rural" => Ok(ConsoleCommand::Population(PopulationType::Rural)),
            "status" => Ok(ConsoleCommand::Status),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(Error::Validation(format!("unknown command: {}", other))),
        }
    }
}

/// Read commands until `quit` or end of input.
///
/// At end of input a running simulation is left to finish its episode.
pub async fn run<I>(handle: DriverHandle, input: I) -> Result<()>
where
    I: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match command {
            ConsoleCommand::Start => handle.start().await?,
            ConsoleCommand::Stop => handle.stop().await?,
            ConsoleCommand::Reset => handle.reset().await?,
            ConsoleCommand::Population(population) => handle.set_population(population).await?,
            ConsoleCommand::Status => {
                let status = handle.current_status().await?;
                println!("{}", serde_json::to_string(&status)?);
            }
            ConsoleCommand::Quit => return Ok(()),
        }
    }

    if handle.current_status().await?.run_state == RunState::Running {
        info!("Input closed, waiting for the epidemic to run its course");
        handle.wait_for(|s| s.run_state == RunState::Idle).await?;
    }

    Ok(())
}
