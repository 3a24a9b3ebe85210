//! Local file asset source using lofty
//!
//! Opening an item probes the container for its duration. Metadata is
//! delivered in two steps: text tags first, then the front cover.

use crate::error::Result;
use cadenza_playback::{
    Artwork, Asset, AssetHandle, AssetSource, LoadFailure, LoadRequest, MetadataResponder,
    MetadataUpdate,
};
use lofty::{AudioFile, PictureType, TaggedFileExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Largest embedded picture passed on as artwork (5MB)
const MAX_ARTWORK_SIZE: usize = 5 * 1024 * 1024;

/// A probed local audio file
#[derive(Debug, Clone)]
pub struct LocalAsset {
    pub path: PathBuf,
    pub duration: Option<Duration>,
}

impl Asset for LocalAsset {
    fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

/// Everything the loader reads from one file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub duration: Option<Duration>,
    pub tags: MetadataUpdate,
    pub artwork: Option<Artwork>,
}

/// Resolve an item source to a filesystem path
///
/// Accepts plain paths and `file://` locators.
pub fn source_path(source: &str) -> PathBuf {
    PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
}

/// Read duration, text tags and cover art from a file
pub fn probe(path: &Path) -> Result<FileReport> {
    let tagged_file = lofty::read_from_path(path)?;

    let duration = Some(tagged_file.properties().duration()).filter(|d| !d.is_zero());
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let (tags, artwork) = match tag {
        Some(tag) => (text_tags(tag), front_cover(tag)),
        None => (MetadataUpdate::default(), None),
    };

    Ok(FileReport {
        duration,
        tags,
        artwork,
    })
}

fn text_tags(tag: &lofty::Tag) -> MetadataUpdate {
    let mut update = MetadataUpdate::default();

    for item in tag.items() {
        let text = item.value().text().map(|s| s.to_string());
        match item.key() {
            lofty::ItemKey::TrackTitle => update.title = text,
            lofty::ItemKey::TrackArtist => update.artist = text,
            lofty::ItemKey::AlbumTitle => update.album = text,
            _ => {}
        }
    }

    update
}

fn front_cover(tag: &lofty::Tag) -> Option<Artwork> {
    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| matches!(p.pic_type(), PictureType::CoverFront))
        .or_else(|| pictures.first())?;

    let data = picture.data();
    if data.len() > MAX_ARTWORK_SIZE {
        debug!(size = data.len(), "embedded artwork too large, skipping");
        return None;
    }

    let mime_type = picture
        .mime_type()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());

    Some(Artwork::Image {
        data: Arc::from(data),
        mime_type,
    })
}

/// Asset source for files on the local disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileLoader;

impl LocalFileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl AssetSource for LocalFileLoader {
    fn open(&mut self, request: &LoadRequest) -> std::result::Result<AssetHandle, LoadFailure> {
        let path = source_path(&request.source);
        if !path.exists() {
            return Err(LoadFailure::new(format!("file not found: {}", path.display())));
        }

        let tagged_file = lofty::read_from_path(&path)
            .map_err(|e| LoadFailure::new(format!("{}: {}", path.display(), e)))?;
        let duration = Some(tagged_file.properties().duration()).filter(|d| !d.is_zero());

        Ok(Arc::new(LocalAsset { path, duration }))
    }

    fn read_metadata(&mut self, request: &LoadRequest, responder: &MetadataResponder) {
        let path = source_path(&request.source);
        let report = match probe(&path) {
            Ok(report) => report,
            Err(e) => {
                debug!(item = %request.item_id, error = %e, "no metadata");
                return;
            }
        };

        responder.deliver(MetadataUpdate {
            duration: report.duration,
            ..report.tags
        });
        if let Some(artwork) = report.artwork {
            responder.deliver(MetadataUpdate {
                artwork: Some(artwork),
                ..Default::default()
            });
        }
    }
}
