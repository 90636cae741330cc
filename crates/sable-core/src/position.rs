//! The single mutable position a search perturbs and restores.

use std::fmt;
use std::ops::{Deref, DerefMut};

use cozy_chess::{BitBoard, Board, Color, File, Move, Piece, Square};
use tracing::trace;

use crate::error::PositionError;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// State needed to reverse one `play` or `play_null`.
#[derive(Debug, Clone)]
struct Undo {
    board: Board,
    floor: usize,
    null: bool,
}

/// A chess position with exact play/undo and repetition history.
///
/// `keys` holds the Zobrist key of every position that preceded the current
/// one, game history included, so repetitions reaching back before the
/// search root are still detected. `floor` is the first index a repetition
/// scan may look at; a null move raises it because positions on the far side
/// of a passed turn cannot legally recur.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    keys: Vec<u64>,
    undo: Vec<Undo>,
    floor: usize,
}

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Self::from_board(Board::default())
    }

    /// Parse a position from FEN.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let board = Board::from_fen(fen, false).map_err(|_| PositionError::InvalidFen {
            fen: fen.to_string(),
        })?;
        Ok(Self::from_board(board))
    }

    /// Wrap an existing board with empty history.
    pub fn from_board(board: Board) -> Self {
        Self {
            board,
            keys: Vec::with_capacity(256),
            undo: Vec::with_capacity(256),
            floor: 0,
        }
    }

    /// The underlying board.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Zobrist key of the current position.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.board.hash()
    }

    /// Side to move.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Whether the side to move is in check.
    #[inline]
    pub fn in_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    /// Plies since the last capture or pawn move.
    #[inline]
    pub fn halfmove_clock(&self) -> u8 {
        self.board.halfmove_clock()
    }

    /// Number of moves (including null moves) that can currently be undone.
    #[inline]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Whether the current position already occurred earlier in the game or
    /// on the current search path.
    ///
    /// Only positions inside the reversible window (bounded by the halfmove
    /// clock) and above the null-move floor are considered.
    pub fn is_repetition(&self) -> bool {
        let key = self.board.hash();
        let window = self.board.halfmove_clock() as usize;
        let start = self.floor.max(self.keys.len().saturating_sub(window));
        self.keys[start..].iter().rev().any(|&k| k == key)
    }

    /// Generate legal moves.
    ///
    /// With `captures_only`, only captures (en passant included) and
    /// promotions are returned. Order is unspecified.
    pub fn generate_moves(&self, captures_only: bool) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        self.board.generate_moves(|piece_moves| {
            for mv in piece_moves {
                if !captures_only || mv.promotion.is_some() || self.is_capture(mv) {
                    moves.push(mv);
                }
            }
            false
        });
        moves
    }

    /// Whether the side to move has at least one legal move.
    pub fn has_legal_moves(&self) -> bool {
        self.board
            .generate_moves(|piece_moves| piece_moves.into_iter().next().is_some())
    }

    /// Whether `mv` captures a piece (including en passant).
    ///
    /// Castling is encoded king-takes-own-rook and is never a capture.
    #[inline]
    pub fn is_capture(&self, mv: Move) -> bool {
        self.captured_piece(mv).is_some()
    }

    /// The piece kind removed by `mv`, if any.
    pub fn captured_piece(&self, mv: Move) -> Option<Piece> {
        let theirs = self.board.colors(!self.board.side_to_move());
        if theirs.has(mv.to) {
            return self.board.piece_on(mv.to);
        }
        // A pawn changing file onto an empty square is en passant.
        if self.board.piece_on(mv.from) == Some(Piece::Pawn) && mv.from.file() != mv.to.file() {
            return Some(Piece::Pawn);
        }
        None
    }

    /// The kind of piece making `mv`.
    #[inline]
    pub fn moving_piece(&self, mv: Move) -> Piece {
        self.board.piece_on(mv.from).unwrap_or(Piece::Pawn)
    }

    /// Whether `color` owns anything besides king and pawns.
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let board = &self.board;
        let pieces: BitBoard = board.pieces(Piece::Knight)
            | board.pieces(Piece::Bishop)
            | board.pieces(Piece::Rook)
            | board.pieces(Piece::Queen);
        !(pieces & board.colors(color)).is_empty()
    }

    /// Apply a legal move.
    pub fn play(&mut self, mv: Move) {
        self.keys.push(self.board.hash());
        self.undo.push(Undo {
            board: self.board.clone(),
            floor: self.floor,
            null: false,
        });
        self.board.play_unchecked(mv);
    }

    /// Reverse the most recent [`play`](Self::play) of `mv`.
    pub fn undo(&mut self, mv: Move) {
        let Some(undo) = self.undo.pop() else {
            debug_assert!(false, "undo of {mv} with nothing to undo");
            return;
        };
        debug_assert!(!undo.null, "undo of {mv} but last move was a null move");
        debug_assert!(
            undo.board.piece_on(mv.from).is_some(),
            "undo of {mv} does not match the recorded position"
        );
        self.keys.pop();
        self.board = undo.board;
        self.floor = undo.floor;
    }

    /// Pass the turn without moving.
    ///
    /// Returns `false` and leaves the position untouched when the side to
    /// move is in check.
    pub fn play_null(&mut self) -> bool {
        let Some(next) = self.board.null_move() else {
            return false;
        };
        self.keys.push(self.board.hash());
        self.undo.push(Undo {
            board: std::mem::replace(&mut self.board, next),
            floor: self.floor,
            null: true,
        });
        self.floor = self.keys.len();
        true
    }

    /// Reverse the most recent [`play_null`](Self::play_null).
    pub fn undo_null(&mut self) {
        let Some(undo) = self.undo.pop() else {
            debug_assert!(false, "undo_null with nothing to undo");
            return;
        };
        debug_assert!(undo.null, "undo_null but last move was a real move");
        self.keys.pop();
        self.board = undo.board;
        self.floor = undo.floor;
    }

    /// Apply `mv` and return a guard that undoes it when dropped.
    pub fn play_guarded(&mut self, mv: Move) -> Played<'_> {
        self.play(mv);
        Played { pos: self, mv }
    }

    /// Pass the turn and return a guard that restores it when dropped.
    ///
    /// Returns `None` when the side to move is in check.
    pub fn null_guarded(&mut self) -> Option<NullPlayed<'_>> {
        if self.play_null() {
            Some(NullPlayed { pos: self })
        } else {
            None
        }
    }

    /// Render `mv` in UCI notation, castling as a two-square king move.
    ///
    /// Must be called before `mv` is played.
    pub fn format_uci(&self, mv: Move) -> String {
        let stm = self.board.side_to_move();
        let castles = self.board.piece_on(mv.from) == Some(Piece::King)
            && self.board.colors(stm).has(mv.to);
        if !castles {
            return mv.to_string();
        }
        let file = if mv.to.file() as u8 > mv.from.file() as u8 {
            File::G
        } else {
            File::C
        };
        let shown = Move {
            from: mv.from,
            to: Square::new(file, mv.from.rank()),
            promotion: None,
        };
        shown.to_string()
    }

    /// Parse a UCI move and check it is legal here.
    ///
    /// Accepts castling as a two-square king move (`e1g1`) as well as the
    /// king-takes-rook form.
    pub fn parse_uci(&self, text: &str) -> Result<Move, PositionError> {
        let illegal = || PositionError::IllegalMove {
            uci_move: text.to_string(),
        };
        let mut mv: Move = text.parse().map_err(|_| illegal())?;

        let from_file = mv.from.file() as i8;
        let to_file = mv.to.file() as i8;
        if self.board.piece_on(mv.from) == Some(Piece::King) && (from_file - to_file).abs() == 2 {
            let rook_file = if to_file > from_file { File::H } else { File::A };
            mv.to = Square::new(rook_file, mv.from.rank());
        }

        if self.generate_moves(false).contains(&mv) {
            Ok(mv)
        } else {
            Err(illegal())
        }
    }

    /// Parse and play a UCI move, recording it in the repetition history.
    pub fn play_uci(&mut self, text: &str) -> Result<Move, PositionError> {
        let mv = self.parse_uci(text)?;
        trace!(uci_move = text, "applying game move");
        self.play(mv);
        Ok(mv)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl fmt::Display for Position {
    /// Formats the position as FEN.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

/// A played move that is undone when the guard is dropped.
///
/// Derefs to the [`Position`] after the move, so a search can recurse
/// through it. Early returns and `?` unwinds restore the position too.
pub struct Played<'a> {
    pos: &'a mut Position,
    mv: Move,
}

impl Deref for Played<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.pos
    }
}

impl DerefMut for Played<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.pos
    }
}

impl Drop for Played<'_> {
    fn drop(&mut self) {
        self.pos.undo(self.mv);
    }
}

/// A passed turn that is restored when the guard is dropped.
pub struct NullPlayed<'a> {
    pos: &'a mut Position,
}

impl Deref for NullPlayed<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.pos
    }
}

impl DerefMut for NullPlayed<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.pos
    }
}

impl Drop for NullPlayed<'_> {
    fn drop(&mut self) {
        self.pos.undo_null();
    }
}
