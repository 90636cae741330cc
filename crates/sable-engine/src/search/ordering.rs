//! Move ordering: TT move, MVV-LVA captures, killer, then history.

use std::sync::OnceLock;

use sable_core::{Move, Position};

use crate::eval::material::ordering_value;
use crate::search::heuristics::{HistoryTable, KillerTable};

/// Ordering weight of a piece as victim or attacker.
const WEIGHT: [i32; 6] = [1, 3, 3, 5, 9, 0];

/// MVV-LVA scores indexed by `[victim][attacker]`: `victim * 16 - attacker`.
const MVV_LVA: [[i32; 6]; 6] = {
    let mut table = [[0; 6]; 6];
    let mut victim = 0;
    while victim < 6 {
        let mut attacker = 0;
        while attacker < 6 {
            table[victim][attacker] = WEIGHT[victim] * 16 - WEIGHT[attacker];
            attacker += 1;
        }
        victim += 1;
    }
    table
};

const TT_MOVE: i32 = 2_000_000;
const CAPTURE: i32 = 1_000_000;
const KILLER: i32 = 900_000;

/// Ordering score of a capture or promotion.
fn tactical_score(pos: &Position, mv: Move) -> Option<i32> {
    let victim = pos.captured_piece(mv);
    if victim.is_none() && mv.promotion.is_none() {
        return None;
    }
    let mut score = CAPTURE;
    if let Some(victim) = victim {
        let attacker = pos.moving_piece(mv);
        score += MVV_LVA[victim as usize][attacker as usize];
    }
    if let Some(promo) = mv.promotion {
        score += ordering_value(promo) / 8;
    }
    Some(score)
}

/// Score a move for the main search.
///
/// Bands, highest first: TT move, captures and promotions, the killer at
/// this ply, then quiet moves by history.
pub fn score_move(
    pos: &Position,
    mv: Move,
    tt_move: Option<Move>,
    killers: &KillerTable,
    history: &HistoryTable,
    ply: usize,
) -> i32 {
    if tt_move == Some(mv) {
        return TT_MOVE;
    }
    if let Some(score) = tactical_score(pos, mv) {
        return score;
    }
    if killers.is_killer(ply, mv) {
        return KILLER;
    }
    history.score(pos.side_to_move(), pos.moving_piece(mv), mv)
}

/// LMR reduction table in 1024ths of a ply, `[move_index][depth]`.
static LMR_TABLE: OnceLock<[[i32; 64]; 64]> = OnceLock::new();

fn lmr_table() -> &'static [[i32; 64]; 64] {
    LMR_TABLE.get_or_init(|| {
        let mut t = [[0i32; 64]; 64];
        for (i, row) in t.iter_mut().enumerate().skip(1) {
            for (d, cell) in row.iter_mut().enumerate().skip(1) {
                *cell = ((0.76 + (i as f64).ln() * (d as f64).ln() / 2.32) * 1024.0) as i32;
            }
        }
        t
    })
}

/// Whole-ply LMR reduction for the `move_index`-th move at `depth`.
pub fn lmr_reduction(move_index: usize, depth: i32) -> i32 {
    lmr_table()[move_index.min(63)][depth.clamp(0, 63) as usize] / 1024
}

/// Yields moves in descending score order by selection sort.
///
/// Most nodes cut off after a move or two, so sorting lazily beats a full sort.
pub struct MovePicker {
    moves: Vec<Move>,
    scores: Vec<i32>,
    cursor: usize,
}

impl MovePicker {
    /// Picker for a main-search node.
    pub fn new(
        pos: &Position,
        moves: Vec<Move>,
        tt_move: Option<Move>,
        killers: &KillerTable,
        history: &HistoryTable,
        ply: usize,
    ) -> Self {
        let scores = moves
            .iter()
            .map(|&mv| score_move(pos, mv, tt_move, killers, history, ply))
            .collect();
        Self {
            moves,
            scores,
            cursor: 0,
        }
    }

    /// Picker for quiescence: captures and promotions first, check evasions
    /// in generation order after them.
    pub fn new_qsearch(pos: &Position, moves: Vec<Move>) -> Self {
        let scores = moves
            .iter()
            .map(|&mv| tactical_score(pos, mv).unwrap_or(0))
            .collect();
        Self {
            moves,
            scores,
            cursor: 0,
        }
    }

    /// Next highest-scored move, or `None` when exhausted.
    pub fn pick_next(&mut self) -> Option<Move> {
        if self.cursor >= self.moves.len() {
            return None;
        }

        let mut best_idx = self.cursor;
        for i in (self.cursor + 1)..self.moves.len() {
            if self.scores[i] > self.scores[best_idx] {
                best_idx = i;
            }
        }

        self.moves.swap(self.cursor, best_idx);
        self.scores.swap(self.cursor, best_idx);

        let mv = self.moves[self.cursor];
        self.cursor += 1;
        Some(mv)
    }
}

/// Whether `mv` is quiet: no capture and no promotion.
#[inline]
pub fn is_quiet(pos: &Position, mv: Move) -> bool {
    mv.promotion.is_none() && !pos.is_capture(mv)
}

#[cfg(test)]
mod tests {
    use sable_core::{Color, Move, Piece, Position, Square};

    use super::*;

    fn mv(from: Square, to: Square) -> Move {
        Move {
            from,
            to,
            promotion: None,
        }
    }

    fn drain(mut picker: MovePicker) -> Vec<Move> {
        std::iter::from_fn(|| picker.pick_next()).collect()
    }

    #[test]
    fn pawn_takes_queen_beats_queen_takes_pawn() {
        let pxq = MVV_LVA[Piece::Queen as usize][Piece::Pawn as usize];
        let qxp = MVV_LVA[Piece::Pawn as usize][Piece::Queen as usize];
        assert_eq!(pxq, 143);
        assert_eq!(qxp, 7);
    }

    #[test]
    fn lighter_attacker_preferred_for_same_victim() {
        let rook = Piece::Rook as usize;
        let pxr = MVV_LVA[rook][Piece::Pawn as usize];
        let nxr = MVV_LVA[rook][Piece::Knight as usize];
        let qxr = MVV_LVA[rook][Piece::Queen as usize];
        assert!(pxr > nxr && nxr > qxr);
    }

    #[test]
    fn picker_yields_every_move_once() {
        let pos = Position::startpos();
        let moves = pos.generate_moves(false);
        let picked = drain(MovePicker::new(
            &pos,
            moves.clone(),
            None,
            &KillerTable::new(),
            &HistoryTable::new(),
            0,
        ));
        assert_eq!(picked.len(), 20);
        for m in moves {
            assert!(picked.contains(&m));
        }
    }

    #[test]
    fn bands_are_ordered() {
        // Qd4 can take e5 pawn or b6 knight; many quiet moves besides.
        let pos = Position::from_fen("4k3/8/1n6/4p3/3Q4/8/8/4K3 w - - 0 1").unwrap();
        let tt_move = mv(Square::E1, Square::F1);
        let killer = mv(Square::D4, Square::A4);
        let favoured = mv(Square::D4, Square::H4);

        let mut killers = KillerTable::new();
        killers.store(2, killer);
        let mut history = HistoryTable::new();
        history.reward(Color::White, Piece::Queen, favoured, 6);

        let picked = drain(MovePicker::new(
            &pos,
            pos.generate_moves(false),
            Some(tt_move),
            &killers,
            &history,
            2,
        ));
        assert_eq!(picked[0], tt_move);
        assert_eq!(picked[1], mv(Square::D4, Square::B6), "QxN before QxP");
        assert_eq!(picked[2], mv(Square::D4, Square::E5));
        assert_eq!(picked[3], killer);
        assert_eq!(picked[4], favoured);
    }

    #[test]
    fn qsearch_picker_orders_promotions_and_captures() {
        let pos = Position::from_fen("1r5k/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let moves = pos.generate_moves(true);
        // a8 pushes and axb8 captures, four promotion pieces each.
        assert_eq!(moves.len(), 8);
        let picked = drain(MovePicker::new_qsearch(&pos, moves));
        assert_eq!(picked[0].to, Square::B8);
        assert_eq!(picked[0].promotion, Some(Piece::Queen));
    }

    #[test]
    fn quiet_classification() {
        let pos = Position::from_fen("4k3/8/8/4p3/3Q4/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_quiet(&pos, mv(Square::D4, Square::D5)));
        assert!(!is_quiet(&pos, mv(Square::D4, Square::E5)));
    }

    #[test]
    fn lmr_reduction_grows_with_depth_and_index() {
        assert!(lmr_reduction(20, 8) > lmr_reduction(4, 8));
        assert!(lmr_reduction(8, 20) > lmr_reduction(8, 4));
        assert!(lmr_reduction(3, 3) >= 0);
    }
}
