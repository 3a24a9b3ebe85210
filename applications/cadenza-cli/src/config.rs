/// CLI configuration
use crate::error::{CliError, Result};
use cadenza_playback::{PlaybackConfig, DEFAULT_QUEUE_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "cadenza.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,

    #[serde(default = "default_loader")]
    pub loader: LoaderSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Simulated seconds per wall-clock second
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Host loop period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderSettings {
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `cadenza.toml` in the working
    /// directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, Self::environment())
    }

    /// Environment overrides, e.g. `CADENZA_PLAYBACK__END_GUARD_MS=2000`
    fn environment() -> config::Environment {
        config::Environment::with_prefix("CADENZA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_from(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(environment);

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()?;

        if !self.simulation.speed.is_finite() || self.simulation.speed <= 0.0 {
            return Err(CliError::Config(format!(
                "simulation speed must be positive, got {}",
                self.simulation.speed
            )));
        }

        if self.simulation.tick_ms == 0 {
            return Err(CliError::Config(
                "simulation tick_ms must be greater than zero".to_string(),
            ));
        }

        if self.loader.queue_depth == 0 {
            return Err(CliError::Config(
                "loader queue_depth must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        speed: default_speed(),
        tick_ms: default_tick_ms(),
    }
}

fn default_speed() -> f64 {
    1.0
}

fn default_tick_ms() -> u64 {
    50
}

fn default_loader() -> LoaderSettings {
    LoaderSettings {
        queue_depth: default_queue_depth(),
    }
}

fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            simulation: default_simulation(),
            loader: default_loader(),
        }
    }
}
