//! History-based MVP ring buffers (§3 "HMVP buffers").
//!
//! One instance lives per entry point (tile / entropy-sync substream) and
//! is owned by the PARSE task for that entry point; it is reset whenever a
//! new CTU row begins under wavefront entropy sync, or at a new tile, or a
//! new slice.

use std::collections::VecDeque;

use super::types::{Mv, MvField};

const CAPACITY: usize = 5;

/// Ring of up to [`CAPACITY`] `MvField`s for regular inter coding.
#[derive(Debug, Clone, Default)]
pub struct HmvpBuffer {
    entries: VecDeque<MvField>,
}

impl HmvpBuffer {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(CAPACITY),
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Push a newly decoded inter CU's motion onto the ring, evicting the
    /// oldest entry if full. Per the VVC spec, an entry identical to the
    /// most-recently-pushed one is not removed here — pruning happens at
    /// candidate-construction time (duplicate skip), not at push time.
    pub fn push(&mut self, mvf: MvField) {
        if self.entries.len() == CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(mvf);
    }

    /// Iterate newest to oldest, as merge-list history scan requires
    /// (§4.4.1 step 3).
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &MvField> {
        self.entries.iter().rev()
    }
}

/// Ring of up to [`CAPACITY`] block-vector entries for IBC.
#[derive(Debug, Clone, Default)]
pub struct HmvpIbcBuffer {
    entries: VecDeque<Mv>,
}

impl HmvpIbcBuffer {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(CAPACITY),
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&mut self, bv: Mv) {
        if self.entries.len() == CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(bv);
    }

    pub fn iter_newest_first(&self) -> impl Iterator<Item = &Mv> {
        self.entries.iter().rev()
    }
}
