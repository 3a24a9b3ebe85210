//! Cadenza - Playback Coordination
//!
//! Platform-agnostic queue and playback-state coordination for Cadenza.
//!
//! This crate provides:
//! - Ordered play queue with stable item identifiers
//! - Shuffle order kept separate from queue order
//! - Repeat modes (Off, One, All)
//! - Asynchronous asset loading with stale-completion protection
//! - Neighbour preloading
//! - Seek by time and by fraction
//! - Now-playing publication and audio session hooks
//!
//! # Architecture
//!
//! `cadenza-playback` never touches audio hardware or files itself:
//! - Assets come from an [`AssetLoader`] (or an [`AssetSource`] run on a
//!   [`ThreadedAssetLoader`])
//! - Audio comes from a [`PlayerBackend`] producing [`Player`]s
//! - OS integration goes through [`NowPlayingPublisher`] and [`AudioSession`]
//!
//! The [`PlaybackCoordinator`] is a single-owner state machine. The host
//! issues commands, forwards [`PlayerEvent`]s, calls
//! [`PlaybackCoordinator::poll`] to apply loader replies and drains
//! [`PlaybackEvent`]s afterwards.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadenza_playback::{
//!     Asset, AssetHandle, AssetSource, Collaborators, LoadFailure, LoadRequest,
//!     PlayableItem, PlaybackConfig, PlaybackCoordinator, Player, PlayerBackend,
//!     StartRequest, ThreadedAssetLoader,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Clip(Duration);
//!
//! impl Asset for Clip {
//!     fn duration(&self) -> Option<Duration> {
//!         Some(self.0)
//!     }
//! }
//!
//! struct Files;
//!
//! impl AssetSource for Files {
//!     fn open(&mut self, _request: &LoadRequest) -> Result<AssetHandle, LoadFailure> {
//!         Ok(Arc::new(Clip(Duration::from_secs(180))))
//!     }
//! }
//!
//! struct Speakers;
//!
//! impl PlayerBackend for Speakers {
//!     fn start(&mut self, _request: StartRequest) -> Result<Box<dyn Player>, LoadFailure> {
//!         Err(LoadFailure::new("no output device"))
//!     }
//! }
//!
//! let loader = ThreadedAssetLoader::spawn(Files).unwrap();
//! let mut coordinator =
//!     PlaybackCoordinator::new(PlaybackConfig::default(), Collaborators::new(Speakers, loader))
//!         .unwrap();
//!
//! coordinator.append(PlayableItem::new("/music/song.mp3"), true);
//! coordinator.play_at(0);
//!
//! // Later, on the owner context
//! coordinator.poll();
//! for event in coordinator.drain_events() {
//!     println!("{:?}", event);
//! }
//! ```

mod error;
mod events;
mod item;
mod loader;
mod manager;
mod platform;
mod player;
mod queue;
mod shuffle;
pub mod types;

// Public exports
pub use error::{LoadFailure, PlaybackError, Result, SessionError};
pub use events::PlaybackEvent;
pub use item::{Artwork, ItemMetadata, MetadataKey, MetadataUpdate, MetadataValue, PlayableItem};
pub use loader::{
    AssetLoader, AssetResponder, AssetSource, LoadRequest, LoaderMessage, MetadataResponder,
    ThreadedAssetLoader, DEFAULT_QUEUE_DEPTH,
};
pub use manager::{Collaborators, PlaybackCoordinator};
pub use platform::{
    AudioSession, NoopAudioSession, NoopNowPlaying, NowPlayingInfo, NowPlayingPublisher,
};
pub use player::{Asset, AssetHandle, Interruption, Player, PlayerBackend, PlayerEvent, StartRequest};
pub use queue::PlayQueue;
pub use shuffle::ShuffleOrder;
pub use types::{ItemId, LoadState, PlaybackConfig, PlaybackState, PlayerId, RepeatMode};
