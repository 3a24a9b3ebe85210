//! Property-based tests for queue and coordinator invariants
//!
//! Uses proptest to run random operation sequences and check that the
//! invariants hold after every step.

mod common;

use cadenza_playback::{
    ItemId, PlayQueue, PlayableItem, PlaybackConfig, PlaybackState, PlayerEvent, RepeatMode,
};
use common::{Harness, ScriptedLoader};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

// ===== Helpers =====

#[derive(Debug, Clone)]
enum QueueOp {
    Append,
    Remove(usize),
    Rearrange(usize, usize),
    Shuffle(bool),
    Select(usize),
    Promote(usize),
}

fn queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => Just(QueueOp::Append),
        1 => (0usize..20).prop_map(QueueOp::Remove),
        2 => (0usize..20, 0usize..20).prop_map(|(a, b)| QueueOp::Rearrange(a, b)),
        1 => any::<bool>().prop_map(QueueOp::Shuffle),
        2 => (0usize..20).prop_map(QueueOp::Select),
        1 => (0usize..20).prop_map(QueueOp::Promote),
    ]
}

fn apply(queue: &mut PlayQueue, op: &QueueOp, next_id: &mut usize) {
    match *op {
        QueueOp::Append => {
            queue.append(PlayableItem::with_id(format!("item-{}", next_id), "/music/x.mp3"));
            *next_id += 1;
        }
        QueueOp::Remove(track) => {
            let id = queue.item_at(track).map(|item| item.id().clone());
            if let Some(id) = id {
                queue.remove(&id);
            }
        }
        QueueOp::Rearrange(from, to) => {
            queue.rearrange(from, to);
        }
        QueueOp::Shuffle(enabled) => queue.set_shuffle(enabled),
        QueueOp::Select(index) => {
            queue.select(index);
        }
        QueueOp::Promote(track) => {
            queue.promote_track(track);
        }
    }
}

#[derive(Debug, Clone)]
enum Command {
    Append,
    PlayAt(usize),
    PlayTrack(usize),
    Next,
    Previous,
    Pause,
    Resume,
    Stop,
    Seek(f64),
    Remove(usize),
    Shuffle(bool),
    Repeat(u8),
    EndOfMedia,
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => Just(Command::Append),
        3 => (0usize..8).prop_map(Command::PlayAt),
        1 => (0usize..8).prop_map(Command::PlayTrack),
        2 => Just(Command::Next),
        1 => Just(Command::Previous),
        1 => Just(Command::Pause),
        1 => Just(Command::Resume),
        1 => Just(Command::Stop),
        1 => (-50.0f64..200.0).prop_map(Command::Seek),
        1 => (0usize..8).prop_map(Command::Remove),
        1 => any::<bool>().prop_map(Command::Shuffle),
        1 => (0u8..3).prop_map(Command::Repeat),
        2 => Just(Command::EndOfMedia),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: the shuffle order stays a permutation of the queue
    #[test]
    fn shuffle_order_is_always_a_permutation(
        seed in any::<u64>(),
        ops in prop::collection::vec(queue_op(), 1..80),
    ) {
        let mut queue = PlayQueue::new(StdRng::seed_from_u64(seed));
        let mut next_id = 0;

        for op in &ops {
            apply(&mut queue, op, &mut next_id);
            if let Some(order) = queue.shuffle_order() {
                prop_assert!(
                    order.is_permutation_of(queue.len()),
                    "order {:?} for {} items after {:?}",
                    order.as_slice(),
                    queue.len(),
                    op
                );
            }
        }
    }

    /// Property: the play index always resolves while the queue is non-empty
    #[test]
    fn play_index_stays_in_bounds(
        seed in any::<u64>(),
        ops in prop::collection::vec(queue_op(), 1..80),
    ) {
        let mut queue = PlayQueue::new(StdRng::seed_from_u64(seed));
        let mut next_id = 0;

        for op in &ops {
            apply(&mut queue, op, &mut next_id);
            if queue.is_empty() {
                prop_assert_eq!(queue.play_index(), 0);
            } else {
                prop_assert!(queue.play_index() < queue.len());
                prop_assert!(queue.track_number(None).is_some());
            }
        }
    }

    /// Property: moving and shuffling never changes which item is selected
    #[test]
    fn selection_survives_reordering(
        seed in any::<u64>(),
        len in 2usize..15,
        pick in 0usize..15,
        moves in prop::collection::vec((0usize..15, 0usize..15, any::<bool>()), 1..30),
    ) {
        let mut queue = PlayQueue::new(StdRng::seed_from_u64(seed));
        for i in 0..len {
            queue.append(PlayableItem::with_id(format!("item-{}", i), "/music/x.mp3"));
        }
        let track = queue.select(pick % len).unwrap();
        let selected: ItemId = queue.items()[track].id().clone();

        for (from, to, shuffle) in moves {
            queue.rearrange(from, to);
            queue.set_shuffle(shuffle);

            prop_assert_eq!(queue.current_id(), Some(&selected));
            let current = queue.track_number(None).unwrap();
            prop_assert_eq!(queue.items()[current].id(), &selected);
        }
    }

    /// Property: a move and its inverse restore order and play index
    #[test]
    fn rearrange_round_trip_restores_queue(
        len in 1usize..15,
        from in 0usize..15,
        to in 0usize..15,
        selected in 0usize..15,
    ) {
        let mut queue = PlayQueue::new(StdRng::seed_from_u64(0));
        for i in 0..len {
            queue.append(PlayableItem::with_id(format!("item-{}", i), "/music/x.mp3"));
        }
        queue.select(selected % len);
        let (from, to) = (from % len, to % len);

        let ids = |queue: &PlayQueue| -> Vec<ItemId> {
            queue.items().iter().map(|item| item.id().clone()).collect()
        };
        let order_before = ids(&queue);
        let index_before = queue.play_index();

        queue.rearrange(from, to);
        queue.rearrange(to, from);

        prop_assert_eq!(ids(&queue), order_before);
        prop_assert_eq!(queue.play_index(), index_before);
    }

    /// Property: random command sequences keep a single, consistent player
    #[test]
    fn coordinator_keeps_one_consistent_player(
        seed in any::<u64>(),
        commands in prop::collection::vec(command(), 1..60),
    ) {
        let config = PlaybackConfig {
            shuffle_seed: Some(seed),
            ..Default::default()
        };
        let mut h = Harness::with_config(config, ScriptedLoader::auto(90));
        let mut next_id = 0;

        for command in &commands {
            match *command {
                Command::Append => {
                    h.coordinator.append(
                        PlayableItem::with_id(format!("item-{}", next_id), "/music/x.mp3"),
                        false,
                    );
                    next_id += 1;
                }
                Command::PlayAt(index) => h.coordinator.play_at(index),
                Command::PlayTrack(track) => h.coordinator.play_track_number(track),
                Command::Next => h.coordinator.play_next(),
                Command::Previous => h.coordinator.play_previous(),
                Command::Pause => h.coordinator.pause(),
                Command::Resume => h.coordinator.resume(),
                Command::Stop => h.coordinator.stop(),
                Command::Seek(seconds) => h.coordinator.seek(seconds, false),
                Command::Remove(track) => {
                    let id = h.coordinator.queue().item_at(track).map(|i| i.id().clone());
                    if let Some(id) = id {
                        h.coordinator.remove(&id);
                    }
                }
                Command::Shuffle(enabled) => h.coordinator.set_shuffle(enabled),
                Command::Repeat(mode) => h.coordinator.set_repeat_mode(match mode {
                    0 => RepeatMode::Off,
                    1 => RepeatMode::One,
                    _ => RepeatMode::All,
                }),
                Command::EndOfMedia => {
                    if let Some(player) = h.coordinator.player_id() {
                        h.coordinator
                            .handle_player_event(PlayerEvent::EndOfMedia { player });
                    }
                }
            }
            h.pump();

            let alive: HashSet<_> = h.backend.log().alive.clone();
            prop_assert!(alive.len() <= 1, "{} players alive after {:?}", alive.len(), command);

            match h.coordinator.state() {
                PlaybackState::Playing | PlaybackState::Paused => {
                    let player = h.coordinator.player_id();
                    prop_assert!(player.is_some());
                    prop_assert!(player.is_some_and(|p| alive.contains(&p)));
                    prop_assert!(h.coordinator.current_item().is_some());
                }
                PlaybackState::Ready | PlaybackState::Failed => {
                    prop_assert!(alive.is_empty());
                    prop_assert!(h.coordinator.current_item().is_none());
                }
                PlaybackState::Loading => {
                    prop_assert!(alive.is_empty());
                    prop_assert!(h.coordinator.current_item().is_some());
                }
            }

            if h.coordinator.current_item().is_some() {
                prop_assert_eq!(
                    h.coordinator.track_number(None),
                    h.coordinator.queue().current_track_number(),
                    "play index {} drifted from the selection after {:?}",
                    h.coordinator.play_index(),
                    command
                );
            }
        }
    }
}
