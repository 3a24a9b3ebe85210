//! Playback host loop
//!
//! Owns the coordinator and drives it from a single task: apply loader
//! replies, advance the simulated clock, forward player events and log what
//! the coordinator reports.

use crate::config::CliConfig;
use crate::error::Result;
use crate::loader::LocalFileLoader;
use crate::simulated::SimulatedBackend;
use cadenza_playback::{
    AssetLoader, Collaborators, NowPlayingInfo, NowPlayingPublisher, PlayableItem,
    PlaybackCoordinator, PlaybackEvent, PlaybackState, ThreadedAssetLoader,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Now-playing publisher that writes to the log
#[derive(Debug, Default)]
pub struct LogNowPlaying;

impl NowPlayingPublisher for LogNowPlaying {
    fn publish(&mut self, info: NowPlayingInfo) {
        info!(
            title = info.title.as_deref().unwrap_or("<untitled>"),
            artist = info.artist.as_deref().unwrap_or(""),
            album = info.album.as_deref().unwrap_or(""),
            elapsed_s = info.elapsed.as_secs(),
            duration_s = info.duration.map(|d| d.as_secs()),
            position = info.queue_position + 1,
            of = info.queue_length,
            playing = info.playback_rate > 0.0,
            "now playing"
        );
    }

    fn clear(&mut self) {
        debug!("now playing cleared");
    }
}

/// Coordinator plus the simulated output it plays through
pub struct Host {
    coordinator: PlaybackCoordinator,
    backend: SimulatedBackend,
    speed: f64,
    started: bool,
}

impl Host {
    /// Host reading local files on a background loader thread
    pub fn new(config: &CliConfig) -> Result<Self> {
        let loader =
            ThreadedAssetLoader::with_queue_depth(LocalFileLoader::new(), config.loader.queue_depth)?;
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: &CliConfig, loader: impl AssetLoader + 'static) -> Result<Self> {
        let backend = SimulatedBackend::new();
        let collaborators =
            Collaborators::new(backend.clone(), loader).with_now_playing(LogNowPlaying);
        let coordinator = PlaybackCoordinator::new(config.playback.clone(), collaborators)?;

        Ok(Self {
            coordinator,
            backend,
            speed: config.simulation.speed,
            started: false,
        })
    }

    /// Queue files without loading them yet
    pub fn enqueue(&mut self, files: &[PathBuf]) {
        for file in files {
            let item = PlayableItem::new(file.display().to_string());
            self.coordinator.append(item, false);
        }
    }

    /// Start playback at a play index
    pub fn start(&mut self, index: usize) {
        if index >= self.coordinator.queue_len() {
            warn!(
                index,
                len = self.coordinator.queue_len(),
                "start index out of range"
            );
            return;
        }
        self.coordinator.play_at(index);
        self.started = true;
    }

    /// Advance by one loop period of `wall` real time
    pub fn step(&mut self, wall: Duration) -> Vec<PlaybackEvent> {
        self.coordinator.poll();

        for event in self.backend.advance(wall.mul_f64(self.speed)) {
            self.coordinator.handle_player_event(event);
        }

        let events = self.coordinator.drain_events();
        for event in &events {
            log_event(event);
        }
        events
    }

    /// Playback has run to completion, failed, or never started
    pub fn is_finished(&self) -> bool {
        !self.started
            || matches!(
                self.coordinator.state(),
                PlaybackState::Ready | PlaybackState::Failed
            )
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut PlaybackCoordinator {
        &mut self.coordinator
    }

    /// Drive the host on a tokio interval until playback ends or Ctrl-C
    pub async fn run(&mut self, period: Duration) -> PlaybackState {
        let mut interval = tokio::time::interval(period);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        while !self.is_finished() {
            tokio::select! {
                _ = interval.tick() => {
                    self.step(period);
                }
                _ = &mut ctrl_c => {
                    info!("interrupted, stopping playback");
                    self.coordinator.stop();
                    self.step(Duration::ZERO);
                    break;
                }
            }
        }

        self.coordinator.state()
    }
}

fn log_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::ProgressChanged {
            item_id,
            position,
            duration,
        } => debug!(item = %item_id, ?position, ?duration, "progress"),
        PlaybackEvent::LoadFailed { item_id, reason } => {
            warn!(item = %item_id, %reason, "load failed");
        }
        PlaybackEvent::AutoplayAdvanced { from, to } => {
            info!(from = ?from, to = ?to, "advanced to next item");
        }
        other => info!(event = ?other, "playback event"),
    }
}
