//! Core types for playback coordination

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of a queue entry, unique within one queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a fresh random identifier (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifies one underlying player instance
///
/// A new id is handed out for every player the coordinator starts, so events
/// from a player that has since been torn down can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Idle, no underlying player
    Ready,

    /// Asset requested, player not started yet
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-item
    Paused,

    /// Last load failed; a new play command is needed
    Failed,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when either end of the queue is passed
    Off,

    /// Loop the current item on natural end
    One,

    /// Loop the entire queue
    All,
}

/// Asset load progress of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
}

/// Configuration for the playback coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Start with shuffle enabled (default: false)
    pub shuffle: bool,

    /// Preload the logical neighbours of the selected item (default: true)
    pub preload_neighbors: bool,

    /// Progress observer interval in milliseconds (default: 50, ~20 Hz)
    pub progress_interval_ms: u64,

    /// Start positions closer than this to the end restart at zero (default: 1500)
    pub end_guard_ms: u64,

    /// Seed for the shuffle generator; `None` seeds from OS entropy
    pub shuffle_seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            repeat: RepeatMode::Off,
            shuffle: false,
            preload_neighbors: true,
            progress_interval_ms: 50,
            end_guard_ms: 1500,
            shuffle_seed: None,
        }
    }
}

impl PlaybackConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn end_guard(&self) -> Duration {
        Duration::from_millis(self.end_guard_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms == 0 {
            return Err(PlaybackError::Config(
                "progress_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
