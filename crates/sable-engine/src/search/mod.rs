//! Iterative deepening driver around the negamax search.

pub mod control;
pub mod heuristics;
pub mod negamax;
pub mod ordering;
pub mod params;
pub mod tt;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use sable_core::{Move, Position};
use tracing::{debug, info};

use crate::eval::evaluate;
use crate::time::{TimeBudget, compute_limits};
use control::SearchControl;
use heuristics::{HistoryTable, KillerTable};
use negamax::{Aborted, INF, MATE, MAX_PLY, NodeResult, SearchContext, is_mate_score, search_node};
use params::SearchParams;
use tt::TranspositionTable;

/// Default transposition table size in megabytes.
pub const DEFAULT_HASH_MB: usize = 16;

/// Result of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Move from the deepest completed iteration; `None` only without legal moves.
    pub best_move: Option<Move>,
    /// Principal variation of that iteration, starting with `best_move`.
    pub pv: Vec<Move>,
    /// Score in centipawns from the side to move's point of view.
    pub score: i32,
    /// Deepest completed iteration, 0 if none completed.
    pub depth: u8,
    /// Deepest ply visited.
    pub seldepth: usize,
    /// Nodes visited, including any abandoned iteration.
    pub nodes: u64,
}

/// Progress report after each completed iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationInfo<'a> {
    pub depth: u8,
    pub seldepth: usize,
    pub score: i32,
    pub nodes: u64,
    pub elapsed: Duration,
    /// Transposition table fill, per mille.
    pub hashfull: u32,
    pub pv: &'a [Move],
}

/// Iterative-deepening searcher.
///
/// Owns the transposition table, which persists across searches within a
/// game, and the killer and history tables, which are reset per search.
pub struct Searcher {
    tt: TranspositionTable,
    killers: KillerTable,
    history: HistoryTable,
    params: SearchParams,
}

impl Searcher {
    /// Searcher with a table of [`DEFAULT_HASH_MB`] megabytes.
    pub fn new() -> Self {
        Self::with_hash(DEFAULT_HASH_MB)
    }

    /// Searcher with a table of `mb` megabytes.
    pub fn with_hash(mb: usize) -> Self {
        Self {
            tt: TranspositionTable::new(mb),
            killers: KillerTable::new(),
            history: HistoryTable::new(),
            params: SearchParams::default(),
        }
    }

    /// Replace the search tunables.
    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    /// Current search tunables.
    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Forget every cached result, e.g. for a new game.
    pub fn clear_tt(&mut self) {
        self.tt.clear();
    }

    /// Reallocate the transposition table at `mb` megabytes.
    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    /// Transposition table fill, per mille.
    pub fn hashfull(&self) -> u32 {
        self.tt.hashfull()
    }

    /// Pick a move for `pos` within `budget`.
    ///
    /// Returns `None` only when there is no legal move. The position is
    /// left exactly as it was given.
    pub fn choose_move(&mut self, pos: &mut Position, budget: TimeBudget) -> Option<Move> {
        let (soft, hard) = compute_limits(&budget);
        let control = SearchControl::new_timed(Arc::new(AtomicBool::new(false)), soft, hard);
        let result = self.search(pos, MAX_PLY as u8 - 1, &control, |_| {});
        if let Some(mv) = result.best_move {
            info!(
                best_move = %pos.format_uci(mv),
                score = result.score,
                depth = result.depth,
                nodes = result.nodes,
                "move chosen"
            );
        }
        result.best_move
    }

    /// Iterative deepening up to `max_depth`, or until `control` says stop.
    ///
    /// Calls `on_iter` after each completed iteration. An iteration cut
    /// short by the hard limit is discarded; the result always comes from
    /// the last completed one, or from the first legal move if depth 1
    /// never completed.
    pub fn search<F>(
        &mut self,
        pos: &mut Position,
        max_depth: u8,
        control: &SearchControl,
        mut on_iter: F,
    ) -> SearchResult
    where
        F: FnMut(&IterationInfo<'_>),
    {
        self.killers.clear();
        self.history.clear();

        let legal = pos.generate_moves(false);
        let Some(&fallback) = legal.first() else {
            return SearchResult {
                best_move: None,
                pv: Vec::new(),
                score: if pos.in_check() { -MATE } else { 0 },
                depth: 0,
                seldepth: 0,
                nodes: 0,
            };
        };

        let mut completed = SearchResult {
            best_move: Some(fallback),
            pv: vec![fallback],
            score: evaluate(pos),
            depth: 0,
            seldepth: 0,
            nodes: 0,
        };

        let mut ctx = SearchContext::new(
            &mut self.tt,
            &mut self.killers,
            &mut self.history,
            control,
            &self.params,
        );

        let max_depth = max_depth.clamp(1, MAX_PLY as u8 - 1);
        let mut prev_score = 0;

        for depth in 1..=max_depth {
            // Depth 1 always runs so there is a searched move to fall back on.
            if depth > 1 && control.should_stop_iterating() {
                break;
            }

            let Ok(root) = aspiration_search(pos, depth, prev_score, &mut ctx) else {
                debug!(depth, nodes = ctx.nodes, "iteration aborted");
                break;
            };
            let Some(best_move) = root.best_move else {
                break;
            };
            prev_score = root.score;

            let pv = ctx.pv.root_pv();
            completed = SearchResult {
                best_move: Some(best_move),
                pv: if pv.first() == Some(&best_move) {
                    pv
                } else {
                    vec![best_move]
                },
                score: root.score,
                depth,
                seldepth: ctx.seldepth,
                nodes: ctx.nodes,
            };

            debug!(
                depth,
                score = root.score,
                nodes = ctx.nodes,
                best_move = %best_move,
                "iteration complete"
            );

            on_iter(&IterationInfo {
                depth,
                seldepth: ctx.seldepth,
                score: root.score,
                nodes: ctx.nodes,
                elapsed: control.elapsed(),
                hashfull: ctx.tt.hashfull(),
                pv: &completed.pv,
            });

            if is_mate_score(root.score) && MATE - root.score.abs() <= depth as i32 {
                break;
            }
        }

        completed.nodes = ctx.nodes;
        completed
    }
}

/// Root search at `depth` with a window around the previous score.
///
/// Shallow depths and mate scores use the full window. A result outside
/// the window is re-searched with that side widened, doubling each time.
fn aspiration_search(
    pos: &mut Position,
    depth: u8,
    prev_score: i32,
    ctx: &mut SearchContext<'_>,
) -> Result<NodeResult, Aborted> {
    let params = ctx.params;
    let full_depth = depth as i32;

    if depth < params.aspiration_min_depth || is_mate_score(prev_score) {
        return search_node(pos, full_depth, 0, -INF, INF, ctx);
    }

    let mut delta = params.aspiration_delta;
    let mut alpha = (prev_score - delta).max(-INF);
    let mut beta = (prev_score + delta).min(INF);

    loop {
        let result = search_node(pos, full_depth, 0, alpha, beta, ctx)?;
        delta = delta.saturating_mul(2);

        if result.score <= alpha {
            debug!(depth, score = result.score, alpha, "aspiration fail low");
            alpha = (result.score - delta).max(-INF);
        } else if result.score >= beta {
            debug!(depth, score = result.score, beta, "aspiration fail high");
            beta = (result.score + delta).min(INF);
        } else {
            return Ok(result);
        }
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("tt", &self.tt)
            .field("params", &self.params)
            .finish()
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use sable_core::Position;

    use super::*;

    fn infinite() -> SearchControl {
        SearchControl::new_infinite(Arc::new(AtomicBool::new(false)))
    }

    fn search_depth(fen: &str, depth: u8) -> SearchResult {
        let mut pos = Position::from_fen(fen).unwrap();
        Searcher::with_hash(1).search(&mut pos, depth, &infinite(), |_| {})
    }

    const SCHOLAR: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    #[test]
    fn depth_1_returns_legal_move() {
        let mut pos = Position::startpos();
        let result = Searcher::with_hash(1).search(&mut pos, 1, &infinite(), |_| {});
        let mv = result.best_move.unwrap();
        assert!(pos.generate_moves(false).contains(&mv));
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn finds_mate_in_one_through_every_depth() {
        for depth in [2, 4, 6] {
            let result = search_depth(SCHOLAR, depth);
            let pos = Position::from_fen(SCHOLAR).unwrap();
            assert_eq!(pos.format_uci(result.best_move.unwrap()), "h5f7", "depth {depth}");
            assert_eq!(result.score, MATE - 1);
        }
    }

    #[test]
    fn stalemate_and_mate_have_no_move() {
        let stalemate = search_depth("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1", 4);
        assert_eq!(stalemate.best_move, None);
        assert_eq!(stalemate.score, 0);

        let mated = search_depth("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1", 4);
        assert_eq!(mated.best_move, None);
        assert_eq!(mated.score, -MATE);
    }

    #[test]
    fn callback_sees_every_depth_with_pv() {
        let mut pos = Position::startpos();
        let mut depths = Vec::new();
        Searcher::with_hash(1).search(&mut pos, 5, &infinite(), |info| {
            assert!(!info.pv.is_empty());
            depths.push(info.depth);
        });
        assert_eq!(depths, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn pv_first_move_matches_best_move() {
        let result = search_depth(sable_core::STARTING_FEN, 4);
        assert_eq!(result.pv.first().copied(), result.best_move);
        assert!(result.pv.len() >= 2);
    }

    #[test]
    fn stop_after_first_iteration_keeps_its_move() {
        let mut pos = Position::startpos();
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(Arc::clone(&stopped));
        let result = Searcher::with_hash(1).search(&mut pos, 60, &control, |_| {
            stopped.store(true, Ordering::Relaxed);
        });
        assert_eq!(result.depth, 1);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn preset_stop_falls_back_to_a_legal_move() {
        let mut pos = Position::startpos();
        let control = SearchControl::new_infinite(Arc::new(AtomicBool::new(true)));
        let result = Searcher::with_hash(1).search(&mut pos, 10, &control, |_| {});
        assert_eq!(result.depth, 0);
        let mv = result.best_move.unwrap();
        assert!(pos.generate_moves(false).contains(&mv));
        assert_eq!(pos.undo_depth(), 0);
    }

    #[test]
    fn mate_found_stops_deepening() {
        let mut depths = Vec::new();
        let mut pos = Position::from_fen(SCHOLAR).unwrap();
        Searcher::with_hash(1).search(&mut pos, 20, &infinite(), |info| depths.push(info.depth));
        assert!(depths.len() < 20, "kept deepening after mate: {depths:?}");
    }

    #[test]
    fn warm_table_gives_same_move() {
        let mut pos = Position::from_fen(SCHOLAR).unwrap();
        let mut searcher = Searcher::with_hash(1);
        let first = searcher.search(&mut pos, 4, &infinite(), |_| {});
        assert!(searcher.hashfull() > 0);
        let second = searcher.search(&mut pos, 4, &infinite(), |_| {});
        assert_eq!(first.best_move, second.best_move);
        searcher.clear_tt();
        assert_eq!(searcher.hashfull(), 0);
    }

    #[test]
    fn choose_move_restores_position() {
        let mut pos = Position::startpos();
        let before = pos.to_string();
        let mv = Searcher::with_hash(1).choose_move(&mut pos, TimeBudget::new(Duration::from_millis(300)));
        assert!(mv.is_some());
        assert_eq!(pos.to_string(), before);
        assert_eq!(pos.undo_depth(), 0);
    }
}
