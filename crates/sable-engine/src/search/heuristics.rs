//! Killer moves and history scores for quiet-move ordering.
//!
//! Both tables are reset at the start of every move decision; only the
//! transposition table survives between searches.

use sable_core::{Color, Move, Piece};

use crate::search::negamax::MAX_PLY;

/// The quiet move that most recently caused a beta cutoff, per ply.
pub struct KillerTable {
    slots: [Option<Move>; MAX_PLY],
}

impl KillerTable {
    /// Create an empty killer table.
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_PLY],
        }
    }

    /// Record `mv` as the killer at `ply`, replacing the previous one.
    pub fn store(&mut self, ply: usize, mv: Move) {
        if let Some(slot) = self.slots.get_mut(ply) {
            *slot = Some(mv);
        }
    }

    /// Whether `mv` is the killer at `ply`.
    pub fn is_killer(&self, ply: usize, mv: Move) -> bool {
        self.slots.get(ply).is_some_and(|slot| *slot == Some(mv))
    }

    /// Forget every killer.
    pub fn clear(&mut self) {
        self.slots = [None; MAX_PLY];
    }
}

#[cfg(test)]
impl KillerTable {
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Cap on any history cell.
const HISTORY_MAX: i32 = 16_384;

/// History heuristic, indexed `[side][moving piece][to square]`.
pub struct HistoryTable {
    table: Box<[[[i32; 64]; 6]; 2]>,
}

impl HistoryTable {
    /// Create a zeroed history table.
    pub fn new() -> Self {
        Self {
            table: Box::new([[[0; 64]; 6]; 2]),
        }
    }

    /// Reward a quiet move that caused a beta cutoff at `depth`.
    pub fn reward(&mut self, side: Color, piece: Piece, mv: Move, depth: i32) {
        let bonus = depth * depth;
        let cell = &mut self.table[side as usize][piece as usize][mv.to as usize];
        *cell = (*cell + bonus).min(HISTORY_MAX);
    }

    /// History score of a quiet move.
    pub fn score(&self, side: Color, piece: Piece, mv: Move) -> i32 {
        self.table[side as usize][piece as usize][mv.to as usize]
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        *self.table = [[[0; 64]; 6]; 2];
    }
}

#[cfg(test)]
impl HistoryTable {
    pub(crate) fn is_empty(&self) -> bool {
        self.table.iter().flatten().flatten().all(|&cell| cell == 0)
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use sable_core::{Color, Move, Piece, Square};

    use super::*;

    fn mv(from: Square, to: Square) -> Move {
        Move {
            from,
            to,
            promotion: None,
        }
    }

    #[test]
    fn killer_replaces_previous() {
        let mut kt = KillerTable::new();
        let a = mv(Square::E2, Square::E4);
        let b = mv(Square::D2, Square::D4);

        kt.store(5, a);
        assert!(kt.is_killer(5, a));
        assert!(!kt.is_killer(5, b));

        kt.store(5, b);
        assert!(kt.is_killer(5, b));
        assert!(!kt.is_killer(5, a));
    }

    #[test]
    fn killer_plies_independent() {
        let mut kt = KillerTable::new();
        let a = mv(Square::G1, Square::F3);
        kt.store(3, a);
        assert!(kt.is_killer(3, a));
        assert!(!kt.is_killer(4, a));
    }

    #[test]
    fn killer_out_of_range_ply_is_ignored() {
        let mut kt = KillerTable::new();
        let a = mv(Square::E2, Square::E4);
        kt.store(MAX_PLY + 3, a);
        assert!(!kt.is_killer(MAX_PLY + 3, a));
        kt.store(0, a);
        kt.clear();
        assert!(!kt.is_killer(0, a));
    }

    #[test]
    fn history_adds_depth_squared() {
        let mut ht = HistoryTable::new();
        let m = mv(Square::G1, Square::F3);
        assert_eq!(ht.score(Color::White, Piece::Knight, m), 0);

        ht.reward(Color::White, Piece::Knight, m, 4);
        ht.reward(Color::White, Piece::Knight, m, 3);
        assert_eq!(ht.score(Color::White, Piece::Knight, m), 25);
        assert_eq!(ht.score(Color::Black, Piece::Knight, m), 0);
        assert_eq!(ht.score(Color::White, Piece::Bishop, m), 0);
    }

    #[test]
    fn history_clamped_and_cleared() {
        let mut ht = HistoryTable::new();
        let m = mv(Square::A2, Square::A3);
        for _ in 0..500 {
            ht.reward(Color::Black, Piece::Pawn, m, 10);
        }
        assert_eq!(ht.score(Color::Black, Piece::Pawn, m), HISTORY_MAX);
        ht.clear();
        assert_eq!(ht.score(Color::Black, Piece::Pawn, m), 0);
    }
}
