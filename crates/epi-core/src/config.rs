//! Configuration types for the simulation.

use crate::{Error, InfectionRate, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Side length of the square grid
pub const GRID_SIZE: usize = 20;

/// Steps an infected cell stays infected before recovering
pub const RECOVERY_TIME: u32 = 6;

/// Milliseconds between two simulation steps while running
pub const DEFAULT_CADENCE_MS: u64 = 800;

/// Population preset selecting the infection rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopulationType {
    Urban,
    #[default]
    Rural,
}

impl PopulationType {
    pub fn infection_rate(&self) -> InfectionRate {
        match self {
            PopulationType::Urban => InfectionRate::clamped(0.4),
            PopulationType::Rural => InfectionRate::clamped(0.2),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PopulationType::Urban => "urban",
            PopulationType::Rural => "rural",
        }
    }

    /// Resolve a selector value, falling back to rural when unrecognized
    pub fn from_selector(selector: &str) -> Self {
        selector.parse().unwrap_or_else(|_| {
            warn!(selector, "Unknown population type, defaulting to rural");
            PopulationType::Rural
        })
    }
}

impl FromStr for PopulationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urban" => Ok(PopulationType::Urban),
            "rural" => Ok(PopulationType::Rural),
            other => Err(Error::Validation(format!(
                "unknown population type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PopulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Side length of the grid
    pub grid_size: usize,
    /// Population preset (sets the infection rate)
    pub population: PopulationType,
    /// Random seed for reproducibility; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            population: PopulationType::Rural,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(Error::Validation("grid_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Simulation parameters
    pub sim: SimConfig,
    /// Interval between steps while running (milliseconds)
    pub cadence_ms: u64,
    /// Start running as soon as the driver is up
    pub autostart: bool,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            cadence_ms: DEFAULT_CADENCE_MS,
            autostart: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl DriverConfig {
    /// Load from `EPI_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup; missing keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(selector) = lookup("EPI_POPULATION") {
            config.sim.population = PopulationType::from_selector(&selector);
        }

        if let Some(seed) = lookup("EPI_SEED") {
            let seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::Validation(format!("EPI_SEED: {}", e)))?;
            config.sim.seed = Some(seed);
        }

        if let Some(autostart) = lookup("EPI_AUTOSTART") {
            config.autostart = match autostart.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(Error::Validation(format!("EPI_AUTOSTART: {}", other)));
                }
            };
        }

        if let Some(format) = lookup("EPI_LOG_FORMAT") {
            config.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "" => LogFormat::Pretty,
                other => {
                    return Err(Error::Validation(format!("EPI_LOG_FORMAT: {}", other)));
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.sim.validate()?;
        if self.cadence_ms == 0 {
            return Err(Error::Validation("cadence_ms must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_configs() {
        let sim = SimConfig::default();
        assert_eq!(sim.grid_size, 20);
        assert_eq!(sim.population, PopulationType::Rural);
        assert!(sim.seed.is_none());

        let driver = DriverConfig::default();
        assert_eq!(driver.cadence_ms, 800);
        assert!(driver.autostart);
    }

    #[test]
    fn test_population_presets() {
        assert_eq!(PopulationType::Urban.infection_rate().value(), 0.4);
        assert_eq!(PopulationType::Rural.infection_rate().value(), 0.2);
        assert_eq!(PopulationType::default(), PopulationType::Rural);
    }

    #[test]
    fn test_unknown_selector_fails_closed() {
        assert_eq!(PopulationType::from_selector("urban"), PopulationType::Urban);
        assert_eq!(PopulationType::from_selector(" Urban "), PopulationType::Urban);
        assert_eq!(PopulationType::from_selector("suburban"), PopulationType::Rural);
        assert_eq!(PopulationType::from_selector(""), PopulationType::Rural);
        assert!("suburban".parse::<PopulationType>().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = DriverConfig::from_lookup(lookup_from(&[
            ("EPI_POPULATION", "urban"),
            ("EPI_SEED", "42"),
            ("EPI_AUTOSTART", "false"),
            ("EPI_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.sim.population, PopulationType::Urban);
        assert_eq!(config.sim.seed, Some(42));
        assert!(!config.autostart);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let result = DriverConfig::from_lookup(lookup_from(&[("EPI_SEED", "forty-two")]));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = DriverConfig::default();
        config.sim.grid_size = 0;
        assert!(config.validate().is_err());

        let mut config = DriverConfig::default();
        config.cadence_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_population_serialization() {
        let json = serde_json::to_string(&PopulationType::Urban).unwrap();
        assert_eq!(json, "\"urban\"");
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.population, config.population);
        assert_eq!(deserialized.grid_size, config.grid_size);
    }
}
