//! Simulated audio output
//!
//! Stands in for a real render pipeline: players keep a position that the
//! host advances with [`SimulatedBackend::advance`], which reports ticks and
//! end of media the way a real player would.

use cadenza_playback::{LoadFailure, Player, PlayerBackend, PlayerEvent, PlayerId, StartRequest};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug)]
struct Deck {
    position: Duration,
    duration: Option<Duration>,
    volume: f32,
    playing: bool,
    finished: bool,
    observer: Option<Duration>,
    since_tick: Duration,
}

type Decks = Arc<Mutex<BTreeMap<PlayerId, Deck>>>;

fn lock(decks: &Decks) -> MutexGuard<'_, BTreeMap<PlayerId, Deck>> {
    decks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Backend whose players advance on a simulated clock
#[derive(Clone, Default)]
pub struct SimulatedBackend {
    decks: Decks,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of players currently alive
    pub fn live_players(&self) -> usize {
        lock(&self.decks).len()
    }

    /// Position of a live player
    pub fn position(&self, player: PlayerId) -> Option<Duration> {
        lock(&self.decks).get(&player).map(|deck| deck.position)
    }

    /// Volume of a live player
    pub fn volume(&self, player: PlayerId) -> Option<f32> {
        lock(&self.decks).get(&player).map(|deck| deck.volume)
    }

    /// Advance every rolling player by `elapsed`
    ///
    /// Returns at most one tick per player and an end-of-media event for each
    /// player that reached its duration.
    pub fn advance(&self, elapsed: Duration) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        let mut decks = lock(&self.decks);

        for (&player, deck) in decks.iter_mut() {
            if !deck.playing || deck.finished {
                continue;
            }

            deck.position += elapsed;
            if let Some(interval) = deck.observer {
                deck.since_tick += elapsed;
                if deck.since_tick >= interval {
                    deck.since_tick = Duration::ZERO;
                    events.push(PlayerEvent::Tick { player });
                }
            }

            if let Some(duration) = deck.duration {
                if deck.position >= duration {
                    deck.position = duration;
                    deck.finished = true;
                    deck.playing = false;
                    trace!(%player, "reached end of media");
                    events.push(PlayerEvent::EndOfMedia { player });
                }
            }
        }

        events
    }
}

impl PlayerBackend for SimulatedBackend {
    fn start(&mut self, request: StartRequest) -> Result<Box<dyn Player>, LoadFailure> {
        let duration = request.asset.duration();
        if duration.is_some_and(|d| request.position > d) {
            return Err(LoadFailure::new("start position beyond end of media"));
        }

        debug!(player = %request.player_id, ?duration, "simulated player started");
        lock(&self.decks).insert(
            request.player_id,
            Deck {
                position: request.position,
                duration,
                volume: request.volume,
                playing: true,
                finished: false,
                observer: None,
                since_tick: Duration::ZERO,
            },
        );

        Ok(Box::new(SimulatedPlayer {
            id: request.player_id,
            decks: Arc::clone(&self.decks),
        }))
    }
}

struct SimulatedPlayer {
    id: PlayerId,
    decks: Decks,
}

impl SimulatedPlayer {
    fn with_deck<R>(&self, f: impl FnOnce(&mut Deck) -> R) -> Option<R> {
        lock(&self.decks).get_mut(&self.id).map(f)
    }
}

impl Player for SimulatedPlayer {
    fn play(&mut self) {
        self.with_deck(|deck| deck.playing = !deck.finished);
    }

    fn pause(&mut self) {
        self.with_deck(|deck| deck.playing = false);
    }

    fn seek(&mut self, position: Duration) {
        self.with_deck(|deck| {
            deck.position = deck.duration.map_or(position, |d| position.min(d));
            deck.finished = false;
        });
    }

    fn current_time(&self) -> Duration {
        self.with_deck(|deck| deck.position).unwrap_or_default()
    }

    fn duration(&self) -> Option<Duration> {
        self.with_deck(|deck| deck.duration).flatten()
    }

    fn set_volume(&mut self, volume: f32) {
        self.with_deck(|deck| deck.volume = volume);
    }

    fn set_time_observer(&mut self, interval: Option<Duration>) {
        self.with_deck(|deck| {
            deck.observer = interval;
            deck.since_tick = Duration::ZERO;
        });
    }
}

impl Drop for SimulatedPlayer {
    fn drop(&mut self) {
        lock(&self.decks).remove(&self.id);
    }
}
