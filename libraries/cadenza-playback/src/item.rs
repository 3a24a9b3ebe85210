//! Queue entries
//!
//! A [`PlayableItem`] is created by the caller, handed to the queue, and from
//! then on mutated only by the coordinator (load state, position) and by
//! loader replies (asset, metadata).

use crate::player::AssetHandle;
use crate::types::{ItemId, LoadState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Cover art attached to an item
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Artwork {
    /// Location of an image the host can resolve itself
    Url(String),

    /// Embedded image bytes
    Image { data: Arc<[u8]>, mime_type: String },
}

impl fmt::Debug for Artwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artwork::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Artwork::Image { data, mime_type } => f
                .debug_struct("Image")
                .field("bytes", &data.len())
                .field("mime_type", mime_type)
                .finish(),
        }
    }
}

/// Keys that can be overridden per item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKey {
    Title,
    Artist,
    Album,
    Artwork,
}

/// Override value for a [`MetadataKey`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    Artwork(Artwork),
}

impl MetadataValue {
    fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            MetadataValue::Artwork(_) => None,
        }
    }
}

/// Metadata discovered for an item
///
/// Filled asynchronously and possibly in several deliveries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<Artwork>,
    pub duration: Option<Duration>,
}

/// One incremental metadata delivery; `None` fields leave existing values alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<Artwork>,
    pub duration: Option<Duration>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.artwork.is_none()
            && self.duration.is_none()
    }
}

impl ItemMetadata {
    /// Merge a delivery, returning whether anything changed
    pub fn merge(&mut self, update: MetadataUpdate) -> bool {
        let mut changed = false;
        changed |= replace_if_some(&mut self.title, update.title);
        changed |= replace_if_some(&mut self.artist, update.artist);
        changed |= replace_if_some(&mut self.album, update.album);
        changed |= replace_if_some(&mut self.artwork, update.artwork);
        changed |= replace_if_some(&mut self.duration, update.duration);
        changed
    }
}

fn replace_if_some<T: PartialEq>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(value) if slot.as_ref() != Some(&value) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

/// A single queue entry
#[derive(Clone)]
pub struct PlayableItem {
    id: ItemId,
    source: String,

    /// Position to start from when the item begins playing
    pub start_time: Option<Duration>,

    /// One-shot resume position, takes precedence over `start_time`
    pub continue_time: Option<Duration>,

    adjusted_volume: f32,

    /// Title override
    pub custom_title: Option<String>,

    /// Metadata overrides merged over loaded metadata
    pub custom_metadata: HashMap<MetadataKey, MetadataValue>,

    pub(crate) meta: ItemMetadata,
    pub(crate) current_time: Duration,
    pub(crate) load_state: LoadState,
    pub(crate) asset: Option<AssetHandle>,
    pub(crate) metadata_requested: bool,
}

impl PlayableItem {
    /// Create an item with a generated identifier
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_id(ItemId::generate(), source)
    }

    /// Create an item with a caller-chosen identifier
    pub fn with_id(id: impl Into<ItemId>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            start_time: None,
            continue_time: None,
            adjusted_volume: 1.0,
            custom_title: None,
            custom_metadata: HashMap::new(),
            meta: ItemMetadata::default(),
            current_time: Duration::ZERO,
            load_state: LoadState::NotLoaded,
            asset: None,
            metadata_requested: false,
        }
    }

    pub fn start_at(mut self, start: Duration) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.custom_title = Some(title.into());
        self
    }

    pub fn with_override(mut self, key: MetadataKey, value: MetadataValue) -> Self {
        self.custom_metadata.insert(key, value);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.set_adjusted_volume(volume);
        self
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn adjusted_volume(&self) -> f32 {
        self.adjusted_volume
    }

    /// Set the per-item volume, clamped to `[0.0, 1.0]`
    pub fn set_adjusted_volume(&mut self, volume: f32) {
        self.adjusted_volume = if volume.is_nan() {
            1.0
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    pub fn meta(&self) -> &ItemMetadata {
        &self.meta
    }

    /// Last known playback position
    pub fn current_time(&self) -> Duration {
        self.current_time
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn asset(&self) -> Option<&AssetHandle> {
        self.asset.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.asset.is_some()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.meta.duration
    }

    /// Position the next player start should use
    ///
    /// Consumes `continue_time`.
    pub(crate) fn take_start_position(&mut self) -> Duration {
        self.continue_time
            .take()
            .or(self.start_time)
            .unwrap_or(Duration::ZERO)
    }

    pub(crate) fn store_asset(&mut self, asset: AssetHandle) {
        if self.meta.duration.is_none() {
            self.meta.duration = asset.duration();
        }
        self.asset = Some(asset);
        self.load_state = LoadState::Loaded;
    }

    pub(crate) fn reset_load(&mut self) {
        self.asset = None;
        self.load_state = LoadState::NotLoaded;
    }

    fn override_text(&self, key: MetadataKey) -> Option<&str> {
        self.custom_metadata.get(&key).and_then(MetadataValue::as_text)
    }

    /// Title with overrides applied
    pub fn display_title(&self) -> Option<&str> {
        self.custom_title
            .as_deref()
            .or_else(|| self.override_text(MetadataKey::Title))
            .or(self.meta.title.as_deref())
    }

    /// Artist with overrides applied
    pub fn display_artist(&self) -> Option<&str> {
        self.override_text(MetadataKey::Artist)
            .or(self.meta.artist.as_deref())
    }

    /// Album with overrides applied
    pub fn display_album(&self) -> Option<&str> {
        self.override_text(MetadataKey::Album)
            .or(self.meta.album.as_deref())
    }

    /// Artwork with overrides applied
    pub fn display_artwork(&self) -> Option<&Artwork> {
        match self.custom_metadata.get(&MetadataKey::Artwork) {
            Some(MetadataValue::Artwork(artwork)) => Some(artwork),
            _ => self.meta.artwork.as_ref(),
        }
    }
}

impl fmt::Debug for PlayableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayableItem")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("load_state", &self.load_state)
            .field("current_time", &self.current_time)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
