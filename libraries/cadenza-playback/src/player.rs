//! Platform-agnostic player traits
//!
//! Abstracts the audio render pipeline so the coordinator works the same on
//! every platform. The host provides a [`PlayerBackend`] that turns a loaded
//! asset into a running [`Player`], and forwards whatever its players report
//! back as [`PlayerEvent`]s.

use crate::error::LoadFailure;
use crate::types::PlayerId;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A loaded, playable asset produced by an asset loader
pub trait Asset: Send + Sync + Debug {
    /// Total length, if the container reports one
    fn duration(&self) -> Option<Duration>;
}

/// Shared handle to a loaded asset
pub type AssetHandle = Arc<dyn Asset>;

/// Parameters for starting a new underlying player
#[derive(Debug, Clone)]
pub struct StartRequest {
    /// Id the new player must stamp on every event it reports
    pub player_id: PlayerId,

    /// Asset to play
    pub asset: AssetHandle,

    /// Initial position
    pub position: Duration,

    /// Initial volume in `[0.0, 1.0]`
    pub volume: f32,
}

/// Creates underlying players
///
/// The coordinator keeps at most one player alive at a time and drops the
/// previous one before asking for the next.
pub trait PlayerBackend: Send {
    /// Start a new player, already rolling at `request.position`
    ///
    /// # Returns
    /// * `Ok(player)` - Player is running
    /// * `Err(_)` - Asset could not be started; treated like a failed load
    fn start(&mut self, request: StartRequest) -> Result<Box<dyn Player>, LoadFailure>;
}

/// A single running player instance
///
/// Dropping the value tears the player down.
pub trait Player: Send {
    /// Resume playback
    fn play(&mut self);

    /// Pause playback, keeping position
    fn pause(&mut self);

    /// Move to `position`
    fn seek(&mut self, position: Duration);

    /// Current playback position
    fn current_time(&self) -> Duration;

    /// Total length if known
    fn duration(&self) -> Option<Duration>;

    /// Apply a volume in `[0.0, 1.0]`
    fn set_volume(&mut self, volume: f32);

    /// Register (`Some(interval)`) or remove (`None`) the periodic time observer
    ///
    /// While registered the player reports [`PlayerEvent::Tick`] roughly every
    /// `interval`. Must never block.
    fn set_time_observer(&mut self, interval: Option<Duration>);
}

/// Events reported by underlying players
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Periodic time observer fired
    Tick { player: PlayerId },

    /// Media played to its natural end
    EndOfMedia { player: PlayerId },

    /// Playback stalled waiting for data
    Stalled { player: PlayerId },
}

impl PlayerEvent {
    pub fn player(&self) -> PlayerId {
        match *self {
            PlayerEvent::Tick { player }
            | PlayerEvent::EndOfMedia { player }
            | PlayerEvent::Stalled { player } => player,
        }
    }
}

/// Phase of an audio-route or session interruption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended,
}
