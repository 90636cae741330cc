//! UCI protocol front end for sable.

pub mod command;
pub mod engine;
pub mod error;

pub use command::{Command, GoParams, UciOption, parse_command};
pub use engine::{EngineConfig, UciEngine, format_pv, format_score};
pub use error::UciError;
