//! Errors raised while reading protocol commands.

use sable_core::PositionError;

/// Errors that occur when parsing or handling a UCI command.
#[derive(Debug, thiserror::Error)]
pub enum UciError {
    /// The `position` command is missing `startpos` or `fen`.
    #[error("malformed position command")]
    MalformedPosition,

    /// The FEN in a `position fen` command could not be parsed.
    #[error("invalid FEN in position command: {fen}")]
    InvalidFen {
        /// The FEN text that failed to parse.
        fen: String,
    },

    /// A move in the `moves` list is malformed or illegal.
    #[error("invalid move in position command: {uci_move}")]
    InvalidMove {
        /// The offending move text.
        uci_move: String,
    },

    /// A `go` parameter was given without a value.
    #[error("missing value for go parameter '{param}'")]
    MissingGoValue {
        /// Name of the parameter.
        param: String,
    },

    /// A `go` parameter value is not a valid number.
    #[error("invalid value '{value}' for go parameter '{param}'")]
    InvalidGoValue {
        /// Name of the parameter.
        param: String,
        /// The value that failed to parse.
        value: String,
    },

    /// A `setoption` command is malformed or names an unknown option.
    #[error("invalid setoption: {reason}")]
    InvalidOption {
        /// What was wrong with it.
        reason: String,
    },

    /// Reading from stdin failed.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl From<PositionError> for UciError {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::InvalidFen { fen } => UciError::InvalidFen { fen },
            PositionError::IllegalMove { uci_move } => UciError::InvalidMove { uci_move },
        }
    }
}
