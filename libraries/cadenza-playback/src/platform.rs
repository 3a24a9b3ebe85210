//! Platform integration points
//!
//! OS now-playing centers, background task lifetime and audio session setup
//! are reached only through these traits. No-op implementations are provided
//! for hosts (and tests) that have nothing to integrate with.

use crate::error::SessionError;
use crate::item::Artwork;
use std::time::Duration;

/// Snapshot published to the OS now-playing center
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<Artwork>,
    pub duration: Option<Duration>,
    pub elapsed: Duration,
    pub queue_position: usize,
    pub queue_length: usize,
    /// 1.0 while playing, 0.0 otherwise
    pub playback_rate: f32,
}

/// Best-effort now-playing publisher
pub trait NowPlayingPublisher: Send {
    fn publish(&mut self, info: NowPlayingInfo);

    /// No current item
    fn clear(&mut self);
}

/// Audio session and background-task lifecycle
pub trait AudioSession: Send {
    /// Establish the playback session; failure aborts coordinator construction
    fn activate(&mut self) -> Result<(), SessionError>;

    fn begin_background_task(&mut self) {}

    fn end_background_task(&mut self) {}
}

/// Publisher that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNowPlaying;

impl NowPlayingPublisher for NoopNowPlaying {
    fn publish(&mut self, _info: NowPlayingInfo) {}

    fn clear(&mut self) {}
}

/// Session that always activates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudioSession;

impl AudioSession for NoopAudioSession {
    fn activate(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}
