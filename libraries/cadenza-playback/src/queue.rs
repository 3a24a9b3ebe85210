//! Play queue with optional shuffle order
//!
//! Two index spaces live here:
//!
//! ```text
//! play index   ──(shuffle order, or identity)──>   track number
//! (logical,                                       (physical slot in
//!  next/previous)                                  insertion order)
//! ```
//!
//! The queue also remembers which item is currently selected so that every
//! mutation can keep `play_index` pointing at the same item.

use crate::item::PlayableItem;
use crate::shuffle::{moved_track_number, ShuffleOrder};
use crate::types::ItemId;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

/// Ordered queue of playable items
#[derive(Debug)]
pub struct PlayQueue {
    /// Items in insertion order; indices are track numbers
    items: Vec<PlayableItem>,

    /// Logical play position
    play_index: usize,

    /// Present only while shuffle is on
    shuffle: Option<ShuffleOrder>,

    /// Item selected for playback (playing, paused or loading)
    current: Option<ItemId>,

    rng: StdRng,
}

impl PlayQueue {
    /// Create new empty queue
    pub fn new(rng: StdRng) -> Self {
        Self {
            items: Vec::new(),
            play_index: 0,
            shuffle: None,
            current: None,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in insertion order
    pub fn items(&self) -> &[PlayableItem] {
        &self.items
    }

    pub fn play_index(&self) -> usize {
        self.play_index
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle.is_some()
    }

    pub fn shuffle_order(&self) -> Option<&ShuffleOrder> {
        self.shuffle.as_ref()
    }

    pub fn current_id(&self) -> Option<&ItemId> {
        self.current.as_ref()
    }

    /// Track number of the selected item
    pub fn current_track_number(&self) -> Option<usize> {
        self.current.as_ref().and_then(|id| self.position_of(id))
    }

    pub fn current_item(&self) -> Option<&PlayableItem> {
        self.current_track_number().map(|t| &self.items[t])
    }

    pub fn current_item_mut(&mut self) -> Option<&mut PlayableItem> {
        let track = self.current_track_number()?;
        self.items.get_mut(track)
    }

    /// Track number of an item
    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn item(&self, id: &ItemId) -> Option<&PlayableItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn item_mut(&mut self, id: &ItemId) -> Option<&mut PlayableItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn item_at(&self, track: usize) -> Option<&PlayableItem> {
        self.items.get(track)
    }

    pub fn item_at_mut(&mut self, track: usize) -> Option<&mut PlayableItem> {
        self.items.get_mut(track)
    }

    /// Resolve a play index (default: current) to a track number
    ///
    /// Returns `None` when the index is out of bounds for the queue or the
    /// shuffle order. A shuffle entry that itself points outside the queue
    /// resolves to a random valid track instead of failing.
    pub fn track_number(&self, at: Option<usize>) -> Option<usize> {
        let index = at.unwrap_or(self.play_index);
        if index >= self.items.len() {
            return None;
        }
        match &self.shuffle {
            None => Some(index),
            Some(order) => {
                let track = order.get(index)?;
                if track < self.items.len() {
                    Some(track)
                } else {
                    warn!(
                        index,
                        track,
                        len = self.items.len(),
                        "shuffle order points outside the queue"
                    );
                    Some(rand::thread_rng().gen_range(0..self.items.len()))
                }
            }
        }
    }

    /// Play index holding a track number
    pub fn play_index_of(&self, track: usize) -> Option<usize> {
        if track >= self.items.len() {
            return None;
        }
        match &self.shuffle {
            None => Some(track),
            Some(order) => order.slot_of(track),
        }
    }

    /// Add an item at the end, returning its track number
    ///
    /// With shuffle on the new track is appended to the end of the order.
    pub fn append(&mut self, item: PlayableItem) -> usize {
        let track = self.items.len();
        self.items.push(item);
        if let Some(order) = self.shuffle.as_mut() {
            order.push(track);
        }
        track
    }

    /// Remove an item by identifier
    ///
    /// The caller stops playback first when removing the selected item.
    pub fn remove(&mut self, id: &ItemId) -> Option<PlayableItem> {
        let track = self.position_of(id)?;
        if self.current.as_ref() == Some(id) {
            self.current = None;
        }

        let removed = self.items.remove(track);

        if self.shuffle.is_some() {
            self.rebuild_shuffle();
        } else {
            if track < self.play_index {
                self.play_index -= 1;
            }
            self.clamp_play_index();
        }

        Some(removed)
    }

    /// Move one item from track `from` to track `to`
    ///
    /// Returns false (and changes nothing) for `from == to` or out-of-bounds
    /// indices.
    pub fn rearrange(&mut self, from: usize, to: usize) -> bool {
        let len = self.items.len();
        if from == to || from >= len || to >= len {
            return false;
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);

        match self.shuffle.as_mut() {
            Some(order) => order.remap_after_move(from, to),
            None => self.play_index = moved_track_number(self.play_index, from, to),
        }
        true
    }

    /// Turn shuffle on or off
    ///
    /// On: an order is generated if none exists, the selected item moves to
    /// slot 0 and `play_index` resets to 0. Off: `play_index` becomes the
    /// track number of the selected item.
    pub fn set_shuffle(&mut self, enabled: bool) {
        if enabled {
            if self.shuffle.is_none() {
                self.shuffle = Some(ShuffleOrder::generate(self.items.len(), &mut self.rng));
            }
            self.promote_current();
        } else if self.shuffle.is_some() {
            let track = self
                .current_track_number()
                .or_else(|| self.track_number(None))
                .unwrap_or(0);
            self.shuffle = None;
            self.play_index = track;
            self.clamp_play_index();
        }
    }

    /// Replace the shuffle order with a fresh random one over the whole queue
    ///
    /// Keeps the selected item (if any) at slot 0. No-op with shuffle off.
    pub fn rebuild_shuffle(&mut self) {
        if self.shuffle.is_none() {
            return;
        }
        self.shuffle = Some(ShuffleOrder::generate(self.items.len(), &mut self.rng));
        self.promote_current();
    }

    /// Make `track` the next logically played item
    ///
    /// With shuffle on the track moves to slot 0 of the order, otherwise
    /// nothing moves. Returns the play index to play.
    pub fn promote_track(&mut self, track: usize) -> Option<usize> {
        if track >= self.items.len() {
            return None;
        }
        let current = self.current_track_number();
        let Some(order) = self.shuffle.as_mut() else {
            return Some(track);
        };
        if !order.move_to_front(track) {
            return None;
        }
        // The rotation shifts slots, keep the play index on the selection
        if let Some(slot) = current.and_then(|current| order.slot_of(current)) {
            self.play_index = slot;
        }
        Some(0)
    }

    /// Select the item at a play index, returning its track number
    pub fn select(&mut self, index: usize) -> Option<usize> {
        let track = self.track_number(Some(index))?;
        self.play_index = index;
        self.current = Some(self.items[track].id().clone());
        Some(track)
    }

    /// Forget the selection and rewind to the first play index
    pub fn deselect(&mut self) {
        self.current = None;
        self.play_index = 0;
    }

    /// Logical neighbours of a play index, wrapping, without duplicates
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        let len = self.items.len();
        if len < 2 || index >= len {
            return Vec::new();
        }
        let previous = (index + len - 1) % len;
        let next = (index + 1) % len;
        if previous == next {
            vec![next]
        } else {
            vec![previous, next]
        }
    }

    /// Remove every item
    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
        self.play_index = 0;
        if self.shuffle.is_some() {
            self.shuffle = Some(ShuffleOrder::identity(0));
        }
    }

    fn promote_current(&mut self) {
        let current = self.current_track_number();
        if let (Some(track), Some(order)) = (current, self.shuffle.as_mut()) {
            order.move_to_front(track);
        }
        self.play_index = 0;
    }

    fn clamp_play_index(&mut self) {
        if self.items.is_empty() {
            self.play_index = 0;
        } else if self.play_index >= self.items.len() {
            self.play_index = self.items.len() - 1;
        }
    }
}
