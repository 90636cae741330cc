//! Static evaluation for sable.
//!
//! A tapered PeSTO-style evaluator: material and piece-square values, a
//! bishop-pair bonus and a doubled-pawn penalty, blended by game phase.

pub mod material;
pub mod pawns;
pub mod phase;
pub mod pst;
pub mod score;

use sable_core::{Color, Position};

use self::material::bishop_pair;
use self::pawns::doubled_pawns;
use self::phase::game_phase;
use self::pst::pst_value;
use self::score::Score;

/// Bonus for having the move, in centipawns.
pub const TEMPO: i32 = 16;

/// Score of one side's pieces and structure, before tapering.
fn side_terms(pos: &Position, color: Color) -> Score {
    let board = pos.board();
    let mut total = Score::ZERO;
    for (piece, bb) in sable_core::Piece::ALL
        .into_iter()
        .map(|p| (p, board.colored_pieces(color, p)))
    {
        for sq in bb {
            total += pst_value(piece, color, sq);
        }
    }
    total + bishop_pair(board, color) + doubled_pawns(board, color)
}

/// Evaluation from White's point of view, without tempo.
///
/// Swapping colours and flipping the board vertically negates this value.
pub fn evaluate_white(pos: &Position) -> i32 {
    let phase = game_phase(pos.board());
    (side_terms(pos, Color::White) - side_terms(pos, Color::Black)).taper(phase)
}

/// Evaluation from the side to move's point of view, in centipawns.
pub fn evaluate(pos: &Position) -> i32 {
    let white = evaluate_white(pos);
    let relative = match pos.side_to_move() {
        Color::White => white,
        Color::Black => -white,
    };
    relative + TEMPO
}
