//! Errors raised while building or driving a [`Position`](crate::Position).

/// Errors that occur when setting up a position or applying external moves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// The FEN string could not be parsed into a legal board.
    #[error("invalid FEN: {fen}")]
    InvalidFen {
        /// The FEN string that failed to parse.
        fen: String,
    },

    /// A move in UCI notation is malformed or not legal in the current position.
    #[error("illegal move: {uci_move}")]
    IllegalMove {
        /// The offending move text.
        uci_move: String,
    },
}
