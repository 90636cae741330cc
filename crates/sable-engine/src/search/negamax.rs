//! Principal variation search with alpha-beta pruning and quiescence.
//!
//! Every node returns `Result<_, Aborted>`. Running out of time is not a
//! score: `?` carries the abort up the stack, move guards restore the
//! position on the way out, and nothing from an aborted subtree reaches the
//! transposition table or the heuristic tables.

use sable_core::{Move, Position};

use crate::eval::evaluate;
use crate::search::control::SearchControl;
use crate::search::heuristics::{HistoryTable, KillerTable};
use crate::search::ordering::{MovePicker, is_quiet, lmr_reduction};
use crate::search::params::SearchParams;
use crate::search::tt::{Bound, TranspositionTable};

/// Larger than any reachable score.
pub const INF: i32 = 32_000;

/// Score of delivering mate at the root; mate at ply `n` scores `MATE - n`.
pub const MATE: i32 = 30_000;

/// Hard cap on search ply, quiescence included.
pub const MAX_PLY: usize = 64;

/// Scores beyond this magnitude are mates.
pub const MATE_THRESHOLD: i32 = MATE - MAX_PLY as i32;

/// The search ran out of time or was told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("search aborted")]
pub struct Aborted;

/// Score of a node plus the move that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeResult {
    /// Score from the side to move's point of view.
    pub score: i32,
    /// Best move, when the node searched one.
    pub best_move: Option<Move>,
}

impl NodeResult {
    fn leaf(score: i32) -> Self {
        Self {
            score,
            best_move: None,
        }
    }
}

/// Whether `score` is a forced mate for either side.
#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() > MATE_THRESHOLD
}

/// Triangular table collecting the principal variation.
///
/// Row `ply` holds the best line found from that ply onward.
pub struct PvTable {
    moves: [[Option<Move>; MAX_PLY]; MAX_PLY],
    len: [usize; MAX_PLY],
}

impl PvTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            moves: [[None; MAX_PLY]; MAX_PLY],
            len: [0; MAX_PLY],
        }
    }

    /// Forget the line at `ply`; called on entering a node.
    pub fn clear_ply(&mut self, ply: usize) {
        if ply < MAX_PLY {
            self.len[ply] = 0;
        }
    }

    /// Make `mv` followed by the line at `ply + 1` the line at `ply`.
    pub fn update(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        self.moves[ply][0] = Some(mv);
        let child = ply + 1;
        if child < MAX_PLY {
            let copy_len = self.len[child].min(MAX_PLY - 1);
            let (top, bottom) = self.moves.split_at_mut(child);
            top[ply][1..1 + copy_len].copy_from_slice(&bottom[0][..copy_len]);
            self.len[ply] = 1 + copy_len;
        } else {
            self.len[ply] = 1;
        }
    }

    /// The principal variation from the root.
    pub fn root_pv(&self) -> Vec<Move> {
        self.moves[0][..self.len[0]].iter().flatten().copied().collect()
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state threaded through one search.
pub(super) struct SearchContext<'a> {
    /// Nodes visited, quiescence included.
    pub nodes: u64,
    /// Deepest ply reached.
    pub seldepth: usize,
    /// Persists across searches.
    pub tt: &'a mut TranspositionTable,
    pub killers: &'a mut KillerTable,
    pub history: &'a mut HistoryTable,
    pub control: &'a SearchControl,
    pub params: &'a SearchParams,
    pub pv: PvTable,
    /// Ply at which the current null-move search started, if any.
    null_ply: Option<usize>,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        tt: &'a mut TranspositionTable,
        killers: &'a mut KillerTable,
        history: &'a mut HistoryTable,
        control: &'a SearchControl,
        params: &'a SearchParams,
    ) -> Self {
        Self {
            nodes: 0,
            seldepth: 0,
            tt,
            killers,
            history,
            control,
            params,
            pv: PvTable::new(),
            null_ply: None,
        }
    }

    #[inline]
    fn check_time(&self) -> Result<(), Aborted> {
        if self.control.should_stop(self.nodes) {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn visit(&mut self, ply: usize) {
        self.nodes += 1;
        self.seldepth = self.seldepth.max(ply);
    }
}

/// Score-only search used for every node below the root.
#[inline]
pub(super) fn negamax(
    pos: &mut Position,
    depth: i32,
    ply: usize,
    alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_>,
) -> Result<i32, Aborted> {
    search_node(pos, depth, ply, alpha, beta, ctx).map(|node| node.score)
}

/// Search one node to `depth` inside the window `(alpha, beta)`.
///
/// At the root (`ply == 0`) the returned best move is the move to play.
pub(super) fn search_node(
    pos: &mut Position,
    mut depth: i32,
    ply: usize,
    mut alpha: i32,
    mut beta: i32,
    ctx: &mut SearchContext<'_>,
) -> Result<NodeResult, Aborted> {
    debug_assert!(alpha < beta, "empty window ({alpha}, {beta}) at ply {ply}");

    let root = ply == 0;
    let pv_node = beta - alpha > 1;
    ctx.pv.clear_ply(ply);

    if ply >= MAX_PLY {
        return Ok(NodeResult::leaf(evaluate(pos)));
    }

    let in_check = pos.in_check();

    if !root {
        if pos.is_repetition() {
            return Ok(NodeResult::leaf(0));
        }
        if pos.halfmove_clock() >= 100 && (!in_check || pos.has_legal_moves()) {
            return Ok(NodeResult::leaf(0));
        }

        alpha = alpha.max(ply as i32 - MATE);
        beta = beta.min(MATE - ply as i32);
        if alpha >= beta {
            return Ok(NodeResult::leaf(alpha));
        }
    }

    if in_check {
        depth += 1;
    }

    if depth <= 0 {
        return qsearch(pos, ply, alpha, beta, ctx).map(NodeResult::leaf);
    }

    ctx.visit(ply);

    let key = pos.hash();
    let tt_entry = ctx.tt.probe(key).copied();
    let tt_move = tt_entry.and_then(|entry| entry.best_move);
    // PV nodes keep searching so the principal variation stays intact.
    if !root
        && !pv_node
        && let Some(score) = tt_entry.and_then(|entry| entry.cutoff(depth, ply, alpha, beta))
    {
        return Ok(NodeResult::leaf(score));
    }

    let params = ctx.params;
    let side = pos.side_to_move();
    let static_eval = if in_check { -INF } else { evaluate(pos) };
    let prunable = !root && !pv_node && !in_check;

    if prunable {
        if depth <= params.rfp_max_depth && static_eval - params.rfp_margin * depth >= beta {
            return Ok(NodeResult::leaf(static_eval));
        }

        let after_null = ctx.null_ply.is_some_and(|null| null + 1 == ply);
        if params.null_move
            && depth >= 2
            && static_eval >= beta
            && !after_null
            && pos.has_non_pawn_material(side)
        {
            let reduction = params.null_reduction_at(depth);
            if let Some(mut passed) = pos.null_guarded() {
                let outer = ctx.null_ply.replace(ply);
                let result = negamax(&mut passed, depth - 1 - reduction, ply + 1, -beta, -beta + 1, ctx);
                ctx.null_ply = outer;
                let score = -result?;
                if score >= beta {
                    return Ok(NodeResult::leaf(beta));
                }
            }
        }
    }

    let futile = prunable
        && depth <= params.futility_max_depth
        && static_eval + params.futility_margin * depth <= alpha;

    let moves = pos.generate_moves(false);
    if moves.is_empty() {
        let score = if in_check { ply as i32 - MATE } else { 0 };
        return Ok(NodeResult::leaf(score));
    }

    let mut picker = MovePicker::new(pos, moves, tt_move, ctx.killers, ctx.history, ply);
    let original_alpha = alpha;
    let mut best_score = -INF;
    let mut best_move = None;
    let mut searched = 0usize;

    while let Some(mv) = picker.pick_next() {
        ctx.check_time()?;

        let quiet = is_quiet(pos, mv);
        let piece = pos.moving_piece(mv);
        let mut child = pos.play_guarded(mv);
        let gives_check = child.in_check();

        if futile && searched > 0 && quiet && !gives_check {
            continue;
        }

        let new_depth = depth - 1;
        let score = if searched == 0 {
            -negamax(&mut child, new_depth, ply + 1, -beta, -alpha, ctx)?
        } else {
            let reduction = if depth >= params.lmr_min_depth
                && searched >= params.lmr_min_moves
                && quiet
                && !gives_check
                && !in_check
            {
                lmr_reduction(searched, depth).clamp(0, (new_depth - 1).max(0))
            } else {
                0
            };

            let mut score =
                -negamax(&mut child, new_depth - reduction, ply + 1, -alpha - 1, -alpha, ctx)?;
            if score > alpha && reduction > 0 {
                score = -negamax(&mut child, new_depth, ply + 1, -alpha - 1, -alpha, ctx)?;
            }
            if score > alpha && score < beta {
                score = -negamax(&mut child, new_depth, ply + 1, -beta, -alpha, ctx)?;
            }
            score
        };
        drop(child);
        searched += 1;

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
            if score > alpha {
                alpha = score;
                ctx.pv.update(ply, mv);
            }
        }

        if alpha >= beta {
            if quiet {
                ctx.killers.store(ply, mv);
                ctx.history.reward(side, piece, mv, depth);
            }
            break;
        }
    }

    let bound = if best_score >= beta {
        Bound::LowerBound
    } else if best_score > original_alpha {
        Bound::Exact
    } else {
        Bound::UpperBound
    };
    ctx.tt.store(key, best_move, depth, best_score, bound, ply);

    Ok(NodeResult {
        score: best_score,
        best_move,
    })
}

/// Resolve captures and promotions until the position is quiet.
///
/// A side in check may not stand pat: every evasion is searched, and no
/// evasion at all is mate.
fn qsearch(
    pos: &mut Position,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_>,
) -> Result<i32, Aborted> {
    ctx.visit(ply);

    if ply >= MAX_PLY {
        return Ok(evaluate(pos));
    }

    let in_check = pos.in_check();
    if !in_check {
        let stand_pat = evaluate(pos);
        if stand_pat >= beta {
            return Ok(beta);
        }
        alpha = alpha.max(stand_pat);
    }

    let moves = pos.generate_moves(!in_check);
    if in_check && moves.is_empty() {
        return Ok(ply as i32 - MATE);
    }
    let mut picker = MovePicker::new_qsearch(pos, moves);

    while let Some(mv) = picker.pick_next() {
        ctx.check_time()?;

        let mut child = pos.play_guarded(mv);
        let score = -qsearch(&mut child, ply + 1, -beta, -alpha, ctx)?;
        drop(child);

        if score >= beta {
            return Ok(beta);
        }
        alpha = alpha.max(score);
    }

    Ok(alpha)
}
