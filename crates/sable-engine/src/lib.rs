//! Search and evaluation for sable.

pub mod eval;
pub mod search;
pub mod time;

pub use eval::{evaluate, evaluate_white};
pub use search::control::SearchControl;
pub use search::negamax::{Aborted, INF, MATE, MATE_THRESHOLD, MAX_PLY, is_mate_score};
pub use search::params::SearchParams;
pub use search::tt::{Bound, TranspositionTable, TtEntry};
pub use search::{DEFAULT_HASH_MB, IterationInfo, SearchResult, Searcher};
pub use time::{GoLimits, TimeBudget, compute_limits, control_from_go};
