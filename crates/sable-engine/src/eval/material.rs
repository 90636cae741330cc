//! Base piece values and material-only bonuses.

use sable_core::{Board, Color, Piece};

use crate::eval::score::{S, Score};

/// Tapered base value per piece kind, indexed by `Piece as usize`.
pub const MATERIAL_VALUE: [Score; 6] = [
    S(82, 94),
    S(337, 281),
    S(365, 297),
    S(477, 512),
    S(1025, 936),
    S(0, 0),
];

/// Awarded once to a side holding at least two bishops.
pub const BISHOP_PAIR: Score = S(23, 62);

/// Flat middlegame value for move ordering, where one number is enough.
#[inline]
pub fn ordering_value(piece: Piece) -> i32 {
    MATERIAL_VALUE[piece as usize].mg() as i32
}

/// Bishop-pair term for `color`.
pub fn bishop_pair(board: &Board, color: Color) -> Score {
    if board.colored_pieces(color, Piece::Bishop).len() >= 2 {
        BISHOP_PAIR
    } else {
        Score::ZERO
    }
}
