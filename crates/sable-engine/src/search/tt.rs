//! Transposition table: a fixed-size cache of earlier search results.
//!
//! Slots are addressed by `key & mask` with a power-of-two slot count. Each
//! slot keeps the full 64-bit key, so a probe only hits when the stored key
//! equals the probing key; a slot reused by an unrelated position reads as a
//! miss. Stores always overwrite.

use sable_core::Move;

use crate::search::negamax::MATE_THRESHOLD;

/// How the stored score relates to the true value of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// The score is exact (a PV node).
    Exact,
    /// The true value is at least the score (failed high).
    LowerBound,
    /// The true value is at most the score (failed low).
    UpperBound,
}

/// One cached search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    /// Full Zobrist key of the stored position.
    pub key: u64,
    /// Best or refuting move, if the node had one.
    pub best_move: Option<Move>,
    /// Remaining depth the node was searched to.
    pub depth: u8,
    /// Score, with mate distances made node-relative by [`score_to_tt`].
    pub score: i32,
    /// Bound kind of `score`.
    pub bound: Bound,
}

impl TtEntry {
    /// The score to return from a node at `ply` searched to `depth` with
    /// window `(alpha, beta)`, if this entry is enough to decide it.
    ///
    /// Needs at least the requested depth. Exact scores are always usable, a
    /// lower bound only at or above `beta`, an upper bound only at or below
    /// `alpha`.
    pub fn cutoff(&self, depth: i32, ply: usize, alpha: i32, beta: i32) -> Option<i32> {
        if (self.depth as i32) < depth {
            return None;
        }
        let score = score_from_tt(self.score, ply);
        match self.bound {
            Bound::Exact => Some(score),
            Bound::LowerBound if score >= beta => Some(score),
            Bound::UpperBound if score <= alpha => Some(score),
            _ => None,
        }
    }
}

/// Convert a search score to table form.
///
/// A mate score counts plies from the root. Stored as distance from this
/// node instead, the entry stays correct when the position is reached at a
/// different ply.
pub fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_THRESHOLD {
        score + ply as i32
    } else if score < -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

/// Reverse of [`score_to_tt`].
pub fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_THRESHOLD {
        score - ply as i32
    } else if score < -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

/// Always-overwrite transposition table.
pub struct TranspositionTable {
    slots: Vec<Option<TtEntry>>,
    /// `slots.len() - 1`.
    mask: u64,
}

impl TranspositionTable {
    /// Create a table of roughly `mb` megabytes.
    ///
    /// The slot count is the largest power of two that fits, and at least one.
    pub fn new(mb: usize) -> Self {
        let bytes = mb.saturating_mul(1024 * 1024);
        let slot_size = std::mem::size_of::<Option<TtEntry>>();
        let fit = (bytes / slot_size).max(1);
        let count = if fit.is_power_of_two() {
            fit
        } else {
            fit.next_power_of_two() >> 1
        };
        Self::with_slots(count)
    }

    /// Create a table with exactly `count` slots; `count` must be a power of two.
    pub fn with_slots(count: usize) -> Self {
        debug_assert!(count.is_power_of_two());
        Self {
            slots: vec![None; count],
            mask: (count - 1) as u64,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; a table has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Look up `key`. Empty slots and foreign keys are misses.
    #[inline]
    pub fn probe(&self, key: u64) -> Option<&TtEntry> {
        self.slots[(key & self.mask) as usize]
            .as_ref()
            .filter(|entry| entry.key == key)
    }

    /// Write a result for `key` searched at `ply`, replacing whatever was there.
    #[inline]
    pub fn store(
        &mut self,
        key: u64,
        best_move: Option<Move>,
        depth: i32,
        score: i32,
        bound: Bound,
        ply: usize,
    ) {
        self.slots[(key & self.mask) as usize] = Some(TtEntry {
            key,
            best_move,
            depth: depth.clamp(0, u8::MAX as i32) as u8,
            score: score_to_tt(score, ply),
            bound,
        });
    }

    /// Occupied slots per thousand, sampled over the first thousand slots.
    pub fn hashfull(&self) -> u32 {
        let sample = self.slots.len().min(1000);
        let used = self.slots[..sample].iter().filter(|s| s.is_some()).count();
        (used * 1000 / sample) as u32
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("slots", &self.slots.len())
            .field("hashfull", &self.hashfull())
            .finish()
    }
}
