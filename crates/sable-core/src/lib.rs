//! Rules-engine boundary for sable.
//!
//! Board representation and legal move generation come from `cozy-chess`.
//! This crate wraps them in a single mutable [`Position`] with exact
//! play/undo, repetition bookkeeping, and null-move support.

mod error;
mod perft;
mod position;

pub use cozy_chess::{BitBoard, Board, Color, File, Move, Piece, Rank, Square};
pub use error::PositionError;
pub use perft::{divide, perft};
pub use position::{NullPlayed, Played, Position, STARTING_FEN};
