//! Shared test doubles for coordinator integration tests
//!
//! Every double records into an `Arc<Mutex<_>>` the test keeps a clone of,
//! so the coordinator can own the double while the test inspects it.

use cadenza_playback::{
    Asset, AssetHandle, AssetLoader, AssetResponder, AudioSession, Collaborators, LoadFailure,
    LoadRequest, MetadataResponder, MetadataUpdate, NowPlayingInfo, NowPlayingPublisher,
    PlayableItem, PlaybackConfig, PlaybackCoordinator, PlaybackEvent, Player, PlayerBackend,
    PlayerEvent, PlayerId, SessionError, StartRequest,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub type Shared<T> = Arc<Mutex<T>>;

// ===== Assets =====

#[derive(Debug)]
pub struct MockAsset {
    pub duration: Option<Duration>,
}

impl MockAsset {
    pub fn handle(seconds: u64) -> AssetHandle {
        Arc::new(Self {
            duration: Some(Duration::from_secs(seconds)),
        })
    }
}

impl Asset for MockAsset {
    fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

// ===== Player backend =====

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Play,
    Pause,
    Seek(Duration),
    Volume(f32),
    Observer(Option<Duration>),
}

#[derive(Default)]
pub struct BackendLog {
    /// (player, start position, volume) per started player
    pub started: Vec<(PlayerId, Duration, f32)>,
    pub calls: Vec<(PlayerId, PlayerCall)>,
    pub alive: HashSet<PlayerId>,
    pub positions: HashMap<PlayerId, Duration>,
    pub refuse: bool,
}

impl BackendLog {
    pub fn calls_for(&self, player: PlayerId) -> Vec<PlayerCall> {
        self.calls
            .iter()
            .filter(|(id, _)| *id == player)
            .map(|(_, call)| call.clone())
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    log: Shared<BackendLog>,
}

impl RecordingBackend {
    pub fn log(&self) -> MutexGuard<'_, BackendLog> {
        self.log.lock().unwrap()
    }

    /// Move a player's clock, as if audio had been rendered
    pub fn set_position(&self, player: PlayerId, position: Duration) {
        self.log().positions.insert(player, position);
    }
}

impl PlayerBackend for RecordingBackend {
    fn start(&mut self, request: StartRequest) -> Result<Box<dyn Player>, LoadFailure> {
        let mut log = self.log();
        if log.refuse {
            return Err(LoadFailure::new("decoder rejected asset"));
        }
        log.started
            .push((request.player_id, request.position, request.volume));
        log.alive.insert(request.player_id);
        log.positions.insert(request.player_id, request.position);

        Ok(Box::new(RecordingPlayer {
            id: request.player_id,
            duration: request.asset.duration(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingPlayer {
    id: PlayerId,
    duration: Option<Duration>,
    log: Shared<BackendLog>,
}

impl RecordingPlayer {
    fn record(&self, call: PlayerCall) {
        self.log.lock().unwrap().calls.push((self.id, call));
    }
}

impl Player for RecordingPlayer {
    fn play(&mut self) {
        self.record(PlayerCall::Play);
    }

    fn pause(&mut self) {
        self.record(PlayerCall::Pause);
    }

    fn seek(&mut self, position: Duration) {
        self.log.lock().unwrap().positions.insert(self.id, position);
        self.record(PlayerCall::Seek(position));
    }

    fn current_time(&self) -> Duration {
        self.log
            .lock()
            .unwrap()
            .positions
            .get(&self.id)
            .copied()
            .unwrap_or_default()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(PlayerCall::Volume(volume));
    }

    fn set_time_observer(&mut self, interval: Option<Duration>) {
        self.record(PlayerCall::Observer(interval));
    }
}

impl Drop for RecordingPlayer {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.alive.remove(&self.id);
        }
    }
}

// ===== Loader =====

#[derive(Default)]
pub struct LoaderLog {
    pub requests: Vec<LoadRequest>,
    pub metadata_requests: Vec<LoadRequest>,
    pending: Vec<AssetResponder>,
    metadata: Vec<MetadataResponder>,
    /// Answer every request right away with an asset of this length
    auto_seconds: Option<u64>,
}

/// Loader whose answers are scripted by the test
#[derive(Clone, Default)]
pub struct ScriptedLoader {
    log: Shared<LoaderLog>,
}

impl ScriptedLoader {
    /// Loader that answers every request immediately
    pub fn auto(seconds: u64) -> Self {
        let loader = Self::default();
        loader.log().auto_seconds = Some(seconds);
        loader
    }

    pub fn log(&self) -> MutexGuard<'_, LoaderLog> {
        self.log.lock().unwrap()
    }

    pub fn requested_ids(&self) -> Vec<String> {
        self.log()
            .requests
            .iter()
            .map(|r| r.item_id.as_str().to_string())
            .collect()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.log()
            .pending
            .iter()
            .map(|r| r.item_id().as_str().to_string())
            .collect()
    }

    fn take_pending(&self, id: &str) -> Option<AssetResponder> {
        let mut log = self.log();
        let slot = log.pending.iter().position(|r| r.item_id().as_str() == id)?;
        Some(log.pending.remove(slot))
    }

    /// Answer the oldest pending request for `id` with an asset
    pub fn complete(&self, id: &str, seconds: u64) -> bool {
        match self.take_pending(id) {
            Some(responder) => {
                responder.succeed(MockAsset::handle(seconds));
                true
            }
            None => false,
        }
    }

    /// Answer the oldest pending request for `id` with a failure
    pub fn fail(&self, id: &str, reason: &str) -> bool {
        match self.take_pending(id) {
            Some(responder) => {
                responder.fail(LoadFailure::new(reason));
                true
            }
            None => false,
        }
    }

    /// Push a metadata update for `id`
    pub fn deliver(&self, id: &str, update: MetadataUpdate) -> bool {
        let responder = self
            .log()
            .metadata
            .iter()
            .find(|r| r.item_id().as_str() == id)
            .cloned();
        match responder {
            Some(responder) => {
                responder.deliver(update);
                true
            }
            None => false,
        }
    }
}

impl AssetLoader for ScriptedLoader {
    fn load(&mut self, request: LoadRequest, responder: AssetResponder) {
        let mut log = self.log();
        log.requests.push(request);
        let auto_seconds = log.auto_seconds;
        match auto_seconds {
            Some(seconds) => {
                drop(log);
                responder.succeed(MockAsset::handle(seconds));
            }
            None => log.pending.push(responder),
        }
    }

    fn load_metadata(&mut self, request: LoadRequest, responder: MetadataResponder) {
        let mut log = self.log();
        log.metadata_requests.push(request);
        log.metadata.push(responder);
    }
}

// ===== Platform =====

#[derive(Clone, Default)]
pub struct RecordingNowPlaying {
    /// `None` entries record a clear
    pub published: Shared<Vec<Option<NowPlayingInfo>>>,
}

impl RecordingNowPlaying {
    pub fn last(&self) -> Option<NowPlayingInfo> {
        self.published.lock().unwrap().last().cloned().flatten()
    }

    pub fn was_cleared(&self) -> bool {
        matches!(self.published.lock().unwrap().last(), Some(None))
    }
}

impl NowPlayingPublisher for RecordingNowPlaying {
    fn publish(&mut self, info: NowPlayingInfo) {
        self.published.lock().unwrap().push(Some(info));
    }

    fn clear(&mut self) {
        self.published.lock().unwrap().push(None);
    }
}

#[derive(Default)]
pub struct SessionLog {
    pub activations: usize,
    pub background_begun: usize,
    pub background_ended: usize,
}

#[derive(Clone, Default)]
pub struct RecordingSession {
    pub log: Shared<SessionLog>,
}

impl AudioSession for RecordingSession {
    fn activate(&mut self) -> Result<(), SessionError> {
        self.log.lock().unwrap().activations += 1;
        Ok(())
    }

    fn begin_background_task(&mut self) {
        self.log.lock().unwrap().background_begun += 1;
    }

    fn end_background_task(&mut self) {
        self.log.lock().unwrap().background_ended += 1;
    }
}

// ===== Harness =====

pub struct Harness {
    pub coordinator: PlaybackCoordinator,
    pub backend: RecordingBackend,
    pub loader: ScriptedLoader,
    pub now_playing: RecordingNowPlaying,
    pub session: RecordingSession,
}

impl Harness {
    pub fn new(loader: ScriptedLoader) -> Self {
        Self::with_config(PlaybackConfig::default(), loader)
    }

    pub fn with_config(config: PlaybackConfig, loader: ScriptedLoader) -> Self {
        let backend = RecordingBackend::default();
        let now_playing = RecordingNowPlaying::default();
        let session = RecordingSession::default();

        let collaborators = Collaborators::new(backend.clone(), loader.clone())
            .with_now_playing(now_playing.clone())
            .with_session(session.clone());
        let coordinator = PlaybackCoordinator::new(config, collaborators).unwrap();

        Self {
            coordinator,
            backend,
            loader,
            now_playing,
            session,
        }
    }

    /// Append items named by `ids` without loading them
    pub fn add(&mut self, ids: &[&str]) {
        for id in ids {
            self.coordinator
                .append(PlayableItem::with_id(*id, source_for(id)), false);
        }
    }

    /// Apply loader replies and return the events emitted so far
    pub fn pump(&mut self) -> Vec<PlaybackEvent> {
        self.coordinator.poll();
        self.coordinator.drain_events()
    }

    pub fn current_id(&self) -> Option<String> {
        self.coordinator
            .current_item()
            .map(|item| item.id().as_str().to_string())
    }

    pub fn live_player(&self) -> PlayerId {
        self.coordinator.player_id().expect("no live player")
    }

    pub fn end_of_media(&mut self) {
        let player = self.live_player();
        self.coordinator
            .handle_player_event(PlayerEvent::EndOfMedia { player });
    }
}

pub fn source_for(id: &str) -> String {
    format!("/music/{}.mp3", id)
}

pub fn states(events: &[PlaybackEvent]) -> Vec<cadenza_playback::PlaybackState> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::StateChanged { state } => Some(*state),
            _ => None,
        })
        .collect()
}
