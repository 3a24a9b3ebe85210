//! Asset loading boundary
//!
//! Loading happens off the owner context. Loaders answer through responders
//! that push [`LoaderMessage`]s onto a channel owned by the coordinator; the
//! coordinator drains that channel in [`crate::PlaybackCoordinator::poll`].
//!
//! ```text
//! Owner context                         Loader worker
//!        │                                    │
//!        │  load(request, responder)          │
//!        │───────────────────────────────────>│
//!        │                                    │ open asset
//!        │                                    │ (I/O, 5-500ms)
//!        │        LoaderMessage::AssetLoaded  │
//!        │<───────────────────────────────────│
//!        │  poll()                            │
//! ```

use crate::error::LoadFailure;
use crate::item::MetadataUpdate;
use crate::player::AssetHandle;
use crate::types::ItemId;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Request to load one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Item being loaded
    pub item_id: ItemId,

    /// Locator copied from the item
    pub source: String,

    /// Selection generation at the time of the request
    pub ticket: u64,
}

/// Replies delivered back to the coordinator
pub enum LoaderMessage {
    AssetLoaded {
        item_id: ItemId,
        ticket: u64,
        asset: AssetHandle,
    },
    AssetFailed {
        item_id: ItemId,
        ticket: u64,
        reason: String,
    },
    Metadata {
        item_id: ItemId,
        update: MetadataUpdate,
    },
}

impl fmt::Debug for LoaderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderMessage::AssetLoaded { item_id, ticket, .. } => f
                .debug_struct("AssetLoaded")
                .field("item_id", item_id)
                .field("ticket", ticket)
                .finish_non_exhaustive(),
            LoaderMessage::AssetFailed {
                item_id,
                ticket,
                reason,
            } => f
                .debug_struct("AssetFailed")
                .field("item_id", item_id)
                .field("ticket", ticket)
                .field("reason", reason)
                .finish(),
            LoaderMessage::Metadata { item_id, update } => f
                .debug_struct("Metadata")
                .field("item_id", item_id)
                .field("update", update)
                .finish(),
        }
    }
}

/// One-shot reply handle for an asset request
///
/// Consumed by [`AssetResponder::complete`], so a loader cannot answer twice.
/// Dropping it without answering reports a failure.
pub struct AssetResponder {
    tx: Sender<LoaderMessage>,
    item_id: ItemId,
    ticket: u64,
    answered: bool,
}

impl AssetResponder {
    pub(crate) fn new(tx: Sender<LoaderMessage>, item_id: ItemId, ticket: u64) -> Self {
        Self {
            tx,
            item_id,
            ticket,
            answered: false,
        }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn succeed(self, asset: AssetHandle) {
        self.complete(Ok(asset));
    }

    pub fn fail(self, failure: LoadFailure) {
        self.complete(Err(failure));
    }

    pub fn complete(mut self, result: Result<AssetHandle, LoadFailure>) {
        self.answered = true;
        let message = match result {
            Ok(asset) => LoaderMessage::AssetLoaded {
                item_id: self.item_id.clone(),
                ticket: self.ticket,
                asset,
            },
            Err(failure) => LoaderMessage::AssetFailed {
                item_id: self.item_id.clone(),
                ticket: self.ticket,
                reason: failure.0,
            },
        };
        self.send(message);
    }

    fn send(&self, message: LoaderMessage) {
        if self.tx.send(message).is_err() {
            trace!(item = %self.item_id, "coordinator gone, dropping load reply");
        }
    }
}

impl Drop for AssetResponder {
    fn drop(&mut self) {
        if !self.answered {
            self.send(LoaderMessage::AssetFailed {
                item_id: self.item_id.clone(),
                ticket: self.ticket,
                reason: "loader dropped the request".to_string(),
            });
        }
    }
}

/// Reply handle for metadata; may deliver any number of updates
#[derive(Clone)]
pub struct MetadataResponder {
    tx: Sender<LoaderMessage>,
    item_id: ItemId,
}

impl MetadataResponder {
    pub(crate) fn new(tx: Sender<LoaderMessage>, item_id: ItemId) -> Self {
        Self { tx, item_id }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn deliver(&self, update: MetadataUpdate) {
        if update.is_empty() {
            return;
        }
        let message = LoaderMessage::Metadata {
            item_id: self.item_id.clone(),
            update,
        };
        if self.tx.send(message).is_err() {
            trace!(item = %self.item_id, "coordinator gone, dropping metadata");
        }
    }
}

/// Asynchronous asset loader
///
/// Implementations must not block: hand the work to another context and
/// answer through the responder.
pub trait AssetLoader: Send {
    /// Load the playable asset for an item, answering exactly once
    fn load(&mut self, request: LoadRequest, responder: AssetResponder);

    /// Fetch metadata for an item, delivering zero or more updates
    fn load_metadata(&mut self, request: LoadRequest, responder: MetadataResponder) {
        let _ = (request, responder);
    }
}

/// Blocking asset source run on a [`ThreadedAssetLoader`] worker
pub trait AssetSource: Send + 'static {
    /// Open the asset for a request (may do slow I/O)
    fn open(&mut self, request: &LoadRequest) -> Result<AssetHandle, LoadFailure>;

    /// Read metadata for a request, delivering as values become available
    fn read_metadata(&mut self, request: &LoadRequest, responder: &MetadataResponder) {
        let _ = (request, responder);
    }
}

enum Job {
    Asset(LoadRequest, AssetResponder),
    Metadata(LoadRequest, MetadataResponder),
}

/// Default depth of the worker request queue
pub const DEFAULT_QUEUE_DEPTH: usize = 32;

/// Background asset loader
///
/// Runs an [`AssetSource`] on a dedicated thread so slow opens never touch
/// the owner context. Requests that do not fit in the queue fail right away
/// instead of blocking the caller.
pub struct ThreadedAssetLoader {
    request_tx: Option<Sender<Job>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ThreadedAssetLoader {
    /// Spawn the worker thread
    pub fn spawn<S: AssetSource>(source: S) -> std::io::Result<Self> {
        Self::with_queue_depth(source, DEFAULT_QUEUE_DEPTH)
    }

    pub fn with_queue_depth<S: AssetSource>(source: S, depth: usize) -> std::io::Result<Self> {
        let (request_tx, request_rx) = bounded::<Job>(depth.max(1));

        let thread_handle = thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || Self::loader_thread(source, request_rx))?;

        Ok(Self {
            request_tx: Some(request_tx),
            thread_handle: Some(thread_handle),
        })
    }

    fn submit(&self, job: Job) {
        let Some(tx) = self.request_tx.as_ref() else {
            return;
        };
        match tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                warn!("asset loader queue full, rejecting request");
                Self::reject(job, "loader queue full");
            }
            Err(TrySendError::Disconnected(job)) => {
                warn!("asset loader thread has exited");
                Self::reject(job, "loader stopped");
            }
        }
    }

    fn reject(job: Job, reason: &str) {
        match job {
            Job::Asset(_, responder) => responder.fail(LoadFailure::new(reason)),
            Job::Metadata(..) => {}
        }
    }

    fn loader_thread<S: AssetSource>(mut source: S, request_rx: Receiver<Job>) {
        debug!("asset loader thread started");

        // Exits once every sender is gone
        for job in request_rx {
            match job {
                Job::Asset(request, responder) => {
                    let started = std::time::Instant::now();
                    let result = source.open(&request);
                    match &result {
                        Ok(_) => debug!(
                            item = %request.item_id,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "asset opened"
                        ),
                        Err(e) => warn!(item = %request.item_id, error = %e, "asset open failed"),
                    }
                    responder.complete(result);
                }
                Job::Metadata(request, responder) => {
                    source.read_metadata(&request, &responder);
                }
            }
        }

        debug!("asset loader thread exiting");
    }
}

impl AssetLoader for ThreadedAssetLoader {
    fn load(&mut self, request: LoadRequest, responder: AssetResponder) {
        self.submit(Job::Asset(request, responder));
    }

    fn load_metadata(&mut self, request: LoadRequest, responder: MetadataResponder) {
        self.submit(Job::Metadata(request, responder));
    }
}

impl Drop for ThreadedAssetLoader {
    fn drop(&mut self) {
        self.request_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("asset loader thread panicked");
            }
        }
    }
}
