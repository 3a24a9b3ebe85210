//! Playback coordinator - core orchestration
//!
//! Coordinates the play queue, asset loading, the underlying player and the
//! playback state machine:
//!
//! ```text
//!            play_at / load reply           start ok
//!   Ready ───────────────────────> Loading ──────────> Playing <──> Paused
//!     ^                               │                   │
//!     │ stop / remove current         │ load failed       │ end of media
//!     └───────────────────────────────┴──> Failed         └──> next / replay
//! ```
//!
//! Everything runs on the owner context. Loader replies are only applied in
//! [`PlaybackCoordinator::poll`], never from the loader's own thread.

use crate::{
    error::Result,
    events::PlaybackEvent,
    item::PlayableItem,
    loader::{AssetLoader, AssetResponder, LoadRequest, LoaderMessage, MetadataResponder},
    platform::{
        AudioSession, NoopAudioSession, NoopNowPlaying, NowPlayingInfo, NowPlayingPublisher,
    },
    player::{AssetHandle, Interruption, Player, PlayerBackend, PlayerEvent, StartRequest},
    queue::PlayQueue,
    types::{ItemId, LoadState, PlaybackConfig, PlaybackState, PlayerId, RepeatMode},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// External capabilities the coordinator drives
pub struct Collaborators {
    pub backend: Box<dyn PlayerBackend>,
    pub loader: Box<dyn AssetLoader>,
    pub now_playing: Box<dyn NowPlayingPublisher>,
    pub session: Box<dyn AudioSession>,
}

impl Collaborators {
    /// Player backend and loader, with no-op now-playing and session
    pub fn new(
        backend: impl PlayerBackend + 'static,
        loader: impl AssetLoader + 'static,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            loader: Box::new(loader),
            now_playing: Box::new(NoopNowPlaying),
            session: Box::new(NoopAudioSession),
        }
    }

    pub fn with_now_playing(mut self, publisher: impl NowPlayingPublisher + 'static) -> Self {
        self.now_playing = Box::new(publisher);
        self
    }

    pub fn with_session(mut self, session: impl AudioSession + 'static) -> Self {
        self.session = Box::new(session);
        self
    }
}

/// The single live underlying player
struct ActivePlayer {
    id: PlayerId,
    item_id: ItemId,
    handle: Box<dyn Player>,
    polling: bool,
}

/// Central playback coordination
///
/// Owns:
/// - The play queue (items, play index, shuffle order)
/// - The playback state machine
/// - At most one underlying player
/// - Bookkeeping for in-flight asset loads
///
/// All methods take `&mut self`; the host calls them from one context and
/// pumps loader replies with [`poll`](Self::poll).
pub struct PlaybackCoordinator {
    config: PlaybackConfig,
    state: PlaybackState,
    repeat: RepeatMode,
    queue: PlayQueue,

    // Bumped by every selecting play; load tickets are compared against it
    generation: u64,
    in_flight: HashMap<ItemId, u64>,

    player: Option<ActivePlayer>,
    end_observer: Option<PlayerId>,
    next_player_id: u64,

    backend: Box<dyn PlayerBackend>,
    loader: Box<dyn AssetLoader>,
    now_playing: Box<dyn NowPlayingPublisher>,
    session: Box<dyn AudioSession>,
    background_task: bool,

    replies_tx: Sender<LoaderMessage>,
    replies_rx: Receiver<LoaderMessage>,

    // Event queue for host synchronization
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackCoordinator {
    /// Create a coordinator
    ///
    /// Fails if the configuration is invalid or the audio session cannot be
    /// activated.
    pub fn new(config: PlaybackConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let Collaborators {
            backend,
            loader,
            now_playing,
            mut session,
        } = collaborators;
        session.activate()?;

        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut queue = PlayQueue::new(rng);
        if config.shuffle {
            queue.set_shuffle(true);
        }

        let (replies_tx, replies_rx) = unbounded();

        Ok(Self {
            repeat: config.repeat,
            config,
            state: PlaybackState::Ready,
            queue,
            generation: 0,
            in_flight: HashMap::new(),
            player: None,
            end_observer: None,
            next_player_id: 1,
            backend,
            loader,
            now_playing,
            session,
            background_task: false,
            replies_tx,
            replies_rx,
            pending_events: Vec::new(),
        })
    }

    // ===== Queue Management =====

    /// Add an item to the end of the queue
    ///
    /// Returns the item's track number, or `None` if an item with the same
    /// identifier is already queued.
    pub fn append(&mut self, item: PlayableItem, load_assets: bool) -> Option<usize> {
        if self.queue.position_of(item.id()).is_some() {
            warn!(item = %item.id(), "append: identifier already queued");
            return None;
        }

        let track = self.queue.append(item);
        self.emit_queue_changed();

        if load_assets {
            self.request_load(track);
        }
        Some(track)
    }

    /// Remove an item by identifier
    ///
    /// Removing the selected item stops playback first.
    pub fn remove(&mut self, id: &ItemId) -> Option<PlayableItem> {
        self.queue.position_of(id)?;

        if self.queue.current_id() == Some(id) {
            info!(item = %id, "removing current item, stopping playback");
            self.stop();
        }

        let removed = self.queue.remove(id)?;
        self.in_flight.remove(id);
        self.emit_queue_changed();
        Some(removed)
    }

    /// Remove every item whose source equals `source`
    pub fn remove_items(&mut self, source: &str) -> usize {
        let ids: Vec<ItemId> = self
            .queue
            .items()
            .iter()
            .filter(|item| item.source() == source)
            .map(|item| item.id().clone())
            .collect();

        ids.iter().filter(|id| self.remove(id).is_some()).count()
    }

    /// Move the item at track `from` to track `to`
    pub fn rearrange(&mut self, from: usize, to: usize) -> bool {
        if !self.queue.rearrange(from, to) {
            debug!(from, to, len = self.queue.len(), "rearrange ignored");
            return false;
        }
        self.emit_queue_changed();
        true
    }

    /// Stop playback and empty the queue
    pub fn clear_queue(&mut self) {
        self.stop();
        self.queue.clear();
        self.in_flight.clear();
        self.emit_queue_changed();
    }

    /// Turn shuffle on or off without interrupting the current item
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.queue.is_shuffled() == enabled {
            return;
        }
        info!(enabled, "shuffle toggled");
        self.queue.set_shuffle(enabled);
        self.refresh_now_playing();
    }

    pub fn is_shuffled(&self) -> bool {
        self.queue.is_shuffled()
    }

    /// Resolve a play index (default: current) to a track number
    pub fn track_number(&self, at: Option<usize>) -> Option<usize> {
        self.queue.track_number(at)
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Set per-item volume, applied immediately if the item is playing
    pub fn set_item_volume(&mut self, id: &ItemId, volume: f32) {
        let Some(item) = self.queue.item_mut(id) else {
            debug!(item = %id, "set_item_volume: unknown item");
            return;
        };
        item.set_adjusted_volume(volume);
        let volume = item.adjusted_volume();

        if let Some(active) = self.player.as_mut().filter(|p| &p.item_id == id) {
            active.handle.set_volume(volume);
        }
    }

    // ===== Playback Control =====

    /// Play the item at a play index
    ///
    /// Resumes if the index resolves to the item already playing. Otherwise
    /// selects it and starts a player right away when its asset is loaded, or
    /// requests the load and waits in `Loading`. Neighbours are preloaded.
    pub fn play_at(&mut self, index: usize) {
        let Some(track) = self.queue.track_number(Some(index)) else {
            debug!(index, len = self.queue.len(), "play_at: index out of bounds");
            return;
        };

        let playing_same = match (&self.player, self.queue.item_at(track)) {
            (Some(active), Some(item)) => {
                &active.item_id == item.id()
                    && item.is_loaded()
                    && self.queue.current_track_number() == Some(track)
            }
            _ => false,
        };
        if playing_same {
            self.queue.select(index);
            self.resume_player();
            return;
        }

        self.teardown_player();
        self.generation += 1;

        let Some(track) = self.queue.select(index) else {
            return;
        };
        self.begin_background_task();

        if self.queue.item_at(track).is_some_and(PlayableItem::is_loaded) {
            self.start_player(track);
        } else {
            self.set_state(PlaybackState::Loading);
            self.request_load(track);
            self.adopt_load(track);
            self.refresh_now_playing();
        }

        if self.config.preload_neighbors {
            self.preload_neighbors(index);
        }
    }

    /// Play a physical queue slot
    ///
    /// With shuffle on the track is moved to the front of the shuffle order
    /// and play index 0 is played.
    pub fn play_track_number(&mut self, track: usize) {
        let Some(index) = self.queue.promote_track(track) else {
            debug!(track, len = self.queue.len(), "play_track_number: out of bounds");
            return;
        };
        self.play_at(index);
    }

    /// Resume the current player, or start the item at the play index
    pub fn resume(&mut self) {
        if self.player.is_some() {
            self.resume_player();
        } else if !self.queue.is_empty() {
            self.play_at(self.queue.play_index());
        }
    }

    /// Pause playback
    pub fn pause(&mut self) {
        let Some(active) = self.player.as_mut() else {
            debug!("pause: no player");
            return;
        };

        if active.polling {
            active.handle.set_time_observer(None);
            active.polling = false;
        }
        active.handle.pause();
        let position = active.handle.current_time();
        let item_id = active.item_id.clone();
        if let Some(item) = self.queue.item_mut(&item_id) {
            item.current_time = position;
        }

        self.set_state(PlaybackState::Paused);
        self.refresh_now_playing();
    }

    /// Stop playback
    ///
    /// Tears down the player, rewinds to play index 0 and regenerates the
    /// shuffle order. The queue itself is kept.
    pub fn stop(&mut self) {
        self.halt(PlaybackState::Ready);
    }

    /// Advance to the next play index
    ///
    /// Past the end: wraps with `RepeatMode::All`, stops otherwise.
    pub fn play_next(&mut self) {
        if self.queue.current_id().is_none() {
            debug!("play_next: nothing selected");
            return;
        }

        let next = self.queue.play_index() + 1;
        if next < self.queue.len() {
            self.play_at(next);
        } else if self.repeat == RepeatMode::All {
            self.play_at(0);
        } else {
            self.stop();
        }
    }

    /// Step back to the previous play index
    ///
    /// Before the start: wraps with `RepeatMode::All`, stops otherwise.
    pub fn play_previous(&mut self) {
        if self.queue.current_id().is_none() {
            debug!("play_previous: nothing selected");
            return;
        }

        match self.queue.play_index().checked_sub(1) {
            Some(previous) => self.play_at(previous),
            None if self.repeat == RepeatMode::All => self.play_at(self.queue.len() - 1),
            None => self.stop(),
        }
    }

    /// Restart the whole queue from play index 0
    pub fn replay(&mut self) {
        self.seek(0.0, false);
        self.play_at(0);
    }

    /// Restart the current item from zero or from its configured start
    pub fn replay_current_item(&mut self, from_start: bool) {
        let Some(item) = self.queue.current_item() else {
            debug!("replay_current_item: nothing selected");
            return;
        };
        let target = if from_start {
            Duration::ZERO
        } else {
            item.start_time.unwrap_or(Duration::ZERO)
        };
        self.seek(target.as_secs_f64(), true);
    }

    /// Seek the current item to `seconds`
    ///
    /// Negative targets clamp to 0 and targets past the known duration (or
    /// too large for a `Duration`) snap to 0. While the asset is still loading the position is kept for when
    /// the player starts.
    pub fn seek(&mut self, seconds: f64, should_play: bool) {
        let duration = self.current_duration();
        let has_player = self.player.is_some();
        let Some(item) = self.queue.current_item_mut() else {
            debug!(seconds, "seek: nothing selected");
            return;
        };

        let mut target = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        if duration.is_some_and(|d| target > d.as_secs_f64()) {
            target = 0.0;
        }
        // Unrepresentable targets only get here with an unknown duration
        let position = Duration::try_from_secs_f64(target).unwrap_or(Duration::ZERO);

        item.current_time = position;
        if !has_player {
            item.continue_time = Some(position);
        }
        let item_id = item.id().clone();

        if let Some(active) = self.player.as_mut() {
            active.handle.seek(position);
        }
        self.emit(PlaybackEvent::ProgressChanged {
            item_id,
            position,
            duration,
        });

        if should_play && has_player {
            self.resume_player();
        } else {
            self.refresh_now_playing();
        }
    }

    /// Seek to a fraction of the known duration
    pub fn seek_to_progress(&mut self, fraction: f64, should_play: bool) {
        let Some(duration) = self.current_duration().filter(|d| !d.is_zero()) else {
            debug!(fraction, "seek_to_progress: duration unknown");
            return;
        };
        if !fraction.is_finite() {
            return;
        }
        self.seek(duration.as_secs_f64() * fraction.clamp(0.0, 1.0), should_play);
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    // ===== State =====

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn play_index(&self) -> usize {
        self.queue.play_index()
    }

    /// Item selected for playback
    pub fn current_item(&self) -> Option<&PlayableItem> {
        self.queue.current_item()
    }

    /// Id of the live underlying player
    pub fn player_id(&self) -> Option<PlayerId> {
        self.player.as_ref().map(|p| p.id)
    }

    /// Selection generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    // ===== Incoming events =====

    /// Apply every loader reply received so far
    ///
    /// Returns the number of replies handled.
    pub fn poll(&mut self) -> usize {
        let messages: Vec<LoaderMessage> = self.replies_rx.try_iter().collect();
        let count = messages.len();
        for message in messages {
            self.handle_loader_message(message);
        }
        count
    }

    /// Apply a single loader reply
    pub fn handle_loader_message(&mut self, message: LoaderMessage) {
        match message {
            LoaderMessage::AssetLoaded {
                item_id,
                ticket,
                asset,
            } => self.on_asset_loaded(item_id, ticket, asset),
            LoaderMessage::AssetFailed {
                item_id,
                ticket,
                reason,
            } => self.on_asset_failed(item_id, ticket, reason),
            LoaderMessage::Metadata { item_id, update } => {
                let Some(item) = self.queue.item_mut(&item_id) else {
                    return;
                };
                if !item.meta.merge(update) {
                    return;
                }
                self.emit_metadata_updated(item_id.clone());
                if self.queue.current_id() == Some(&item_id) {
                    self.refresh_now_playing();
                }
            }
        }
    }

    /// Apply an event reported by an underlying player
    pub fn handle_player_event(&mut self, event: PlayerEvent) {
        if self.player_id() != Some(event.player()) {
            trace!(?event, "event from retired player");
            return;
        }

        match event {
            PlayerEvent::Tick { .. } => self.on_tick(),
            PlayerEvent::EndOfMedia { player } => {
                if self.end_observer == Some(player) {
                    self.on_end_of_media();
                }
            }
            PlayerEvent::Stalled { .. } => {
                if let Some(active) = self.player.as_mut() {
                    debug!(player = %active.id, "playback stalled, kicking player");
                    active.handle.pause();
                    active.handle.play();
                }
            }
        }
    }

    /// Forward an audio session interruption
    ///
    /// Playback is left as is; the host decides whether to pause.
    pub fn handle_interruption(&mut self, phase: Interruption) {
        match phase {
            Interruption::Began => self.emit(PlaybackEvent::InterruptionBegan),
            Interruption::Ended => self.emit(PlaybackEvent::InterruptionEnded),
        }
    }

    // ===== Events =====

    /// Drain all pending events
    ///
    /// Returns all events emitted since the last drain. The host should call
    /// this after every command and every [`poll`](Self::poll).
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // ===== Internals =====

    fn on_asset_loaded(&mut self, item_id: ItemId, ticket: u64, asset: AssetHandle) {
        let tag = self.in_flight.remove(&item_id).unwrap_or(ticket);
        let Some(track) = self.queue.position_of(&item_id) else {
            trace!(item = %item_id, "loaded item is no longer queued");
            return;
        };
        if let Some(item) = self.queue.item_at_mut(track) {
            item.store_asset(asset);
        }

        let still_selected = self.state == PlaybackState::Loading
            && tag == self.generation
            && self.queue.current_id() == Some(&item_id)
            && self.queue.track_number(None) == Some(track);
        if !still_selected {
            trace!(
                item = %item_id,
                ticket = tag,
                generation = self.generation,
                "stale completion, asset cached"
            );
            return;
        }

        self.start_player(track);
        if self.config.preload_neighbors && self.state == PlaybackState::Playing {
            self.preload_neighbors(self.queue.play_index());
        }
    }

    fn on_asset_failed(&mut self, item_id: ItemId, ticket: u64, reason: String) {
        let tag = self.in_flight.remove(&item_id).unwrap_or(ticket);
        if let Some(item) = self.queue.item_mut(&item_id) {
            item.reset_load();
        }

        let still_selected = self.state == PlaybackState::Loading
            && tag == self.generation
            && self.queue.current_id() == Some(&item_id);
        if !still_selected {
            debug!(item = %item_id, %reason, "background load failed");
            return;
        }

        warn!(item = %item_id, %reason, "load failed");
        self.fail_selection(item_id, reason);
    }

    fn on_tick(&mut self) {
        let Some(active) = self.player.as_ref() else {
            return;
        };
        if !active.polling {
            trace!(player = %active.id, "tick while not polling");
            return;
        }
        let position = active.handle.current_time();
        let item_id = active.item_id.clone();
        let duration = self.current_duration();

        if let Some(item) = self.queue.item_mut(&item_id) {
            item.current_time = position;
        }
        self.emit(PlaybackEvent::ProgressChanged {
            item_id,
            position,
            duration,
        });
    }

    fn on_end_of_media(&mut self) {
        let from = self.queue.current_id().cloned();
        debug!(item = ?from, "end of media");

        if self.repeat == RepeatMode::One {
            self.replay_current_item(false);
            return;
        }

        if self.repeat == RepeatMode::All && self.queue.len() == 1 {
            self.replay_current_item(true);
        } else {
            self.play_next();
        }

        let to = self.queue.current_id().cloned();
        self.emit(PlaybackEvent::AutoplayAdvanced { from, to });
    }

    /// Start a new player for a loaded track
    fn start_player(&mut self, track: usize) {
        let end_guard = self.config.end_guard();
        let Some(item) = self.queue.item_at_mut(track) else {
            return;
        };
        let Some(asset) = item.asset.clone() else {
            return;
        };

        let requested = item.take_start_position();
        let duration = item.meta.duration.or_else(|| asset.duration());
        let position = clamp_start_position(requested, duration, end_guard);
        let volume = item.adjusted_volume();
        let item_id = item.id().clone();
        item.current_time = position;

        self.teardown_player();
        let player_id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        let request = StartRequest {
            player_id,
            asset,
            position,
            volume,
        };
        let mut handle = match self.backend.start(request) {
            Ok(handle) => handle,
            Err(failure) => {
                warn!(item = %item_id, error = %failure, "player backend refused asset");
                self.fail_selection(item_id, failure.0);
                return;
            }
        };

        handle.set_volume(volume);
        handle.set_time_observer(Some(self.config.progress_interval()));
        info!(
            item = %item_id,
            player = %player_id,
            position_ms = position.as_millis() as u64,
            "started player"
        );

        self.player = Some(ActivePlayer {
            id: player_id,
            item_id: item_id.clone(),
            handle,
            polling: true,
        });
        self.end_observer = Some(player_id);
        self.begin_background_task();

        self.set_state(PlaybackState::Playing);
        self.emit(PlaybackEvent::NewPlayerStarted {
            item_id: item_id.clone(),
            player: player_id,
            position,
        });
        self.emit(PlaybackEvent::ItemLoaded {
            item_id,
            track_number: track,
        });
        self.refresh_now_playing();
    }

    fn resume_player(&mut self) {
        let interval = self.config.progress_interval();
        let Some(active) = self.player.as_mut() else {
            return;
        };

        active.handle.play();
        if !active.polling {
            active.handle.set_time_observer(Some(interval));
            active.polling = true;
        }

        self.set_state(PlaybackState::Playing);
        self.refresh_now_playing();
    }

    /// Drop the live player together with its observers
    fn teardown_player(&mut self) {
        self.end_observer = None;
        let Some(mut active) = self.player.take() else {
            return;
        };

        if active.polling {
            active.handle.set_time_observer(None);
        }
        let position = active.handle.current_time();
        if let Some(item) = self.queue.item_mut(&active.item_id) {
            item.current_time = position;
        }
        debug!(player = %active.id, item = %active.item_id, "tore down player");
    }

    fn halt(&mut self, next: PlaybackState) {
        self.teardown_player();
        self.queue.deselect();
        self.queue.rebuild_shuffle();
        self.end_background_task();
        self.now_playing.clear();
        self.set_state(next);
    }

    fn fail_selection(&mut self, item_id: ItemId, reason: String) {
        if let Some(item) = self.queue.item_mut(&item_id) {
            item.reset_load();
        }
        self.emit(PlaybackEvent::LoadFailed { item_id, reason });
        self.halt(PlaybackState::Failed);
    }

    /// Ask the loader for a track's asset (and metadata on first request)
    ///
    /// Items already loading or loaded are left alone.
    fn request_load(&mut self, track: usize) {
        let ticket = self.generation;
        let Some(item) = self.queue.item_at_mut(track) else {
            return;
        };
        if item.load_state != LoadState::NotLoaded {
            return;
        }

        item.load_state = LoadState::Loading;
        let wants_metadata = !item.metadata_requested;
        item.metadata_requested = true;

        let request = LoadRequest {
            item_id: item.id().clone(),
            source: item.source().to_string(),
            ticket,
        };
        self.in_flight.insert(request.item_id.clone(), ticket);
        trace!(item = %request.item_id, ticket, "requesting asset");

        if wants_metadata {
            let responder = MetadataResponder::new(self.replies_tx.clone(), request.item_id.clone());
            self.loader.load_metadata(request.clone(), responder);
        }
        let responder = AssetResponder::new(self.replies_tx.clone(), request.item_id.clone(), ticket);
        self.loader.load(request, responder);
    }

    /// Tie an in-flight load of `track` to the current selection
    fn adopt_load(&mut self, track: usize) {
        if let Some(item) = self.queue.item_at(track) {
            if item.load_state == LoadState::Loading {
                self.in_flight.insert(item.id().clone(), self.generation);
            }
        }
    }

    fn preload_neighbors(&mut self, index: usize) {
        for neighbor in self.queue.neighbors(index) {
            if let Some(track) = self.queue.track_number(Some(neighbor)) {
                self.request_load(track);
            }
        }
    }

    fn current_duration(&self) -> Option<Duration> {
        self.queue
            .current_item()
            .and_then(PlayableItem::duration)
            .or_else(|| self.player.as_ref().and_then(|p| p.handle.duration()))
    }

    fn begin_background_task(&mut self) {
        if !self.background_task {
            self.session.begin_background_task();
            self.background_task = true;
        }
    }

    fn end_background_task(&mut self) {
        if self.background_task {
            self.session.end_background_task();
            self.background_task = false;
        }
    }

    fn refresh_now_playing(&mut self) {
        let Some(item) = self.queue.current_item() else {
            self.now_playing.clear();
            return;
        };

        let info = NowPlayingInfo {
            title: item.display_title().map(str::to_string),
            artist: item.display_artist().map(str::to_string),
            album: item.display_album().map(str::to_string),
            artwork: item.display_artwork().cloned(),
            duration: item.duration(),
            elapsed: item.current_time(),
            queue_position: self.queue.play_index(),
            queue_length: self.queue.len(),
            playback_rate: if self.state == PlaybackState::Playing {
                1.0
            } else {
                0.0
            },
        };
        self.now_playing.publish(info);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        info!(from = ?self.state, to = ?state, "playback state changed");
        self.state = state;
        self.emit(PlaybackEvent::StateChanged { state });
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
    }

    /// Queue a metadata event unless one for the same item is still pending
    fn emit_metadata_updated(&mut self, item_id: ItemId) {
        let pending = self.pending_events.iter().any(|event| {
            matches!(event, PlaybackEvent::MetadataUpdated { item_id: id } if *id == item_id)
        });
        if !pending {
            self.emit(PlaybackEvent::MetadataUpdated { item_id });
        }
    }

    fn emit_queue_changed(&mut self) {
        self.emit(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });
        if self.queue.current_id().is_some() {
            self.refresh_now_playing();
        }
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        self.teardown_player();
        self.end_background_task();
    }
}

/// Start position for a new player
///
/// Positions within `guard` of the end restart the item from zero.
fn clamp_start_position(
    requested: Duration,
    duration: Option<Duration>,
    guard: Duration,
) -> Duration {
    match duration {
        Some(duration) if requested.saturating_add(guard) >= duration => Duration::ZERO,
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadFailure, PlaybackError, SessionError};

    struct NullBackend;

    impl PlayerBackend for NullBackend {
        fn start(&mut self, _request: StartRequest) -> std::result::Result<Box<dyn Player>, LoadFailure> {
            Err(LoadFailure::new("no audio output"))
        }
    }

    struct SilentLoader;

    impl AssetLoader for SilentLoader {
        fn load(&mut self, _request: LoadRequest, _responder: AssetResponder) {}
    }

    struct BrokenSession;

    impl AudioSession for BrokenSession {
        fn activate(&mut self) -> std::result::Result<(), SessionError> {
            Err(SessionError("playback category unavailable".to_string()))
        }
    }

    fn coordinator() -> PlaybackCoordinator {
        PlaybackCoordinator::new(
            PlaybackConfig::default(),
            Collaborators::new(NullBackend, SilentLoader),
        )
        .unwrap()
    }

    #[test]
    fn create_coordinator() {
        let coordinator = coordinator();
        assert_eq!(coordinator.state(), PlaybackState::Ready);
        assert_eq!(coordinator.queue_len(), 0);
        assert_eq!(coordinator.repeat_mode(), RepeatMode::Off);
        assert!(!coordinator.has_pending_events());
    }

    #[test]
    fn session_failure_aborts_construction() {
        let result = PlaybackCoordinator::new(
            PlaybackConfig::default(),
            Collaborators::new(NullBackend, SilentLoader).with_session(BrokenSession),
        );
        assert!(matches!(result, Err(PlaybackError::Configuration(_))));
    }

    #[test]
    fn invalid_config_aborts_construction() {
        let config = PlaybackConfig {
            progress_interval_ms: 0,
            ..Default::default()
        };
        let result =
            PlaybackCoordinator::new(config, Collaborators::new(NullBackend, SilentLoader));
        assert!(matches!(result, Err(PlaybackError::Config(_))));
    }

    #[test]
    fn commands_on_empty_queue_are_noops() {
        let mut coordinator = coordinator();
        coordinator.play_at(0);
        coordinator.play_next();
        coordinator.play_previous();
        coordinator.pause();
        coordinator.seek(10.0, true);
        coordinator.seek_to_progress(0.5, true);
        coordinator.replay_current_item(true);
        assert_eq!(coordinator.state(), PlaybackState::Ready);
        assert!(coordinator.drain_events().is_empty());
    }

    #[test]
    fn dropped_responder_fails_the_selection() {
        let mut coordinator = coordinator();
        coordinator.append(PlayableItem::with_id("a", "a.mp3"), false);
        coordinator.play_at(0);
        assert_eq!(coordinator.state(), PlaybackState::Loading);

        // SilentLoader drops the responder, which reports a failure
        assert_eq!(coordinator.poll(), 1);
        assert_eq!(coordinator.state(), PlaybackState::Failed);
        let events = coordinator.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, PlaybackEvent::LoadFailed { .. })));
    }

    #[test]
    fn start_position_near_end_restarts() {
        let guard = Duration::from_millis(1500);
        let duration = Some(Duration::from_secs(100));

        assert_eq!(
            clamp_start_position(Duration::from_secs(30), duration, guard),
            Duration::from_secs(30)
        );
        assert_eq!(
            clamp_start_position(Duration::from_millis(98_600), duration, guard),
            Duration::ZERO
        );
        assert_eq!(
            clamp_start_position(Duration::from_secs(500), None, guard),
            Duration::from_secs(500)
        );
    }

    #[test]
    fn start_position_at_duration_max_does_not_overflow() {
        let guard = Duration::from_millis(1500);
        assert_eq!(
            clamp_start_position(Duration::MAX, Some(Duration::from_secs(100)), guard),
            Duration::ZERO
        );
        assert_eq!(
            clamp_start_position(Duration::MAX, Some(Duration::MAX), guard),
            Duration::ZERO
        );
    }
}
