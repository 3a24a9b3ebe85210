//! Playback Events
//!
//! Event-based communication with the host. The coordinator queues events
//! at every observable transition; the host drains them with
//! [`crate::PlaybackCoordinator::drain_events`]:
//! - State changes (ready/loading/playing/paused/failed)
//! - Progress (every observer tick and every seek)
//! - Item loaded / new player started
//! - Metadata updates (coalesced until drained)
//! - Autoplay advances and interruptions

use crate::types::{ItemId, PlaybackState, PlayerId};
use std::time::Duration;

/// Events emitted by the playback coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Playback state changed
    StateChanged {
        /// The new playback state
        state: PlaybackState,
    },

    /// Playback position of the current item changed
    ProgressChanged {
        item_id: ItemId,
        position: Duration,
        duration: Option<Duration>,
    },

    /// The current item's asset finished loading and is now playing
    ItemLoaded {
        item_id: ItemId,
        /// Physical queue slot of the item
        track_number: usize,
    },

    /// New metadata arrived for an item
    ///
    /// At most one of these is pending per item between drains.
    MetadataUpdated { item_id: ItemId },

    /// A new underlying player was started
    NewPlayerStarted {
        item_id: ItemId,
        player: PlayerId,
        /// Position the player was started at
        position: Duration,
    },

    /// Natural end of media advanced the queue
    AutoplayAdvanced {
        /// Item that finished (if any)
        from: Option<ItemId>,
        /// Item now selected (if any)
        to: Option<ItemId>,
    },

    /// Audio route / session interruption began
    InterruptionBegan,

    /// Audio route / session interruption ended
    InterruptionEnded,

    /// Loading the current item failed
    LoadFailed { item_id: ItemId, reason: String },

    /// Queue contents or order changed
    QueueChanged {
        /// New queue length
        length: usize,
    },
}

impl PlaybackEvent {
    /// Item the event refers to, if any
    pub fn item_id(&self) -> Option<&ItemId> {
        match self {
            PlaybackEvent::ProgressChanged { item_id, .. }
            | PlaybackEvent::ItemLoaded { item_id, .. }
            | PlaybackEvent::MetadataUpdated { item_id }
            | PlaybackEvent::NewPlayerStarted { item_id, .. }
            | PlaybackEvent::LoadFailed { item_id, .. } => Some(item_id),
            _ => None,
        }
    }
}
