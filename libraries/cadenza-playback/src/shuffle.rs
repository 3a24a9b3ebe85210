//! Shuffle order for queue playback
//!
//! A [`ShuffleOrder`] maps play index → track number. The queue itself is
//! never reordered by shuffling; only this permutation is.

use rand::seq::SliceRandom;
use rand::Rng;

/// Permutation of track numbers with a version counter
///
/// The version is bumped on every rewrite so holders of stale indices can
/// tell the order moved under them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleOrder {
    order: Vec<usize>,
    version: u64,
}

impl ShuffleOrder {
    /// Identity order over `len` track numbers
    pub fn identity(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
            version: 0,
        }
    }

    /// Random order over `len` track numbers
    pub fn generate<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let mut order = Self::identity(len);
        order.shuffle_track_numbers(rng);
        order
    }

    /// Fisher-Yates shuffle in place
    ///
    /// Each arrangement is equally likely. Orders shorter than two entries
    /// are left alone.
    pub fn shuffle_track_numbers<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.order.len() < 2 {
            return;
        }
        self.order.shuffle(rng);
        self.bump();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Track number stored at a play index
    pub fn get(&self, slot: usize) -> Option<usize> {
        self.order.get(slot).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Play index holding `track`
    pub fn slot_of(&self, track: usize) -> Option<usize> {
        self.order.iter().position(|&t| t == track)
    }

    /// Append a track number at the end, leaving existing order alone
    pub fn push(&mut self, track: usize) {
        self.order.push(track);
        self.bump();
    }

    /// Move `track` to slot 0, keeping the relative order of the rest
    ///
    /// Returns false if the track is not part of the order.
    pub fn move_to_front(&mut self, track: usize) -> bool {
        match self.slot_of(track) {
            Some(0) => true,
            Some(slot) => {
                self.order[..=slot].rotate_right(1);
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Rewrite track numbers after the queue moved one item from `from` to `to`
    ///
    /// Every slot keeps referring to the same item.
    pub fn remap_after_move(&mut self, from: usize, to: usize) {
        for track in &mut self.order {
            *track = moved_track_number(*track, from, to);
        }
        self.bump();
    }

    /// True if the order holds each of `0..len` exactly once
    pub fn is_permutation_of(&self, len: usize) -> bool {
        if self.order.len() != len {
            return false;
        }
        let mut seen = vec![false; len];
        for &track in &self.order {
            if track >= len || seen[track] {
                return false;
            }
            seen[track] = true;
        }
        true
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// New track number of the item that was at `track` after moving `from` → `to`
pub(crate) fn moved_track_number(track: usize, from: usize, to: usize) -> usize {
    if track == from {
        to
    } else if from < to && track > from && track <= to {
        track - 1
    } else if to < from && track >= to && track < from {
        track + 1
    } else {
        track
    }
}
