//! Search tunables.

/// Pruning margins, reductions and window sizes used by the search.
///
/// Margins are in centipawns. The defaults are what the engine plays with;
/// tests override them to switch individual techniques off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Deepest remaining depth at which reverse futility pruning applies.
    pub rfp_max_depth: i32,
    /// Reverse futility margin per ply of remaining depth.
    pub rfp_margin: i32,
    /// Whether null-move pruning is tried at all.
    pub null_move: bool,
    /// Null-move reduction, on top of the ply the null move itself uses.
    pub null_reduction: i32,
    /// Extra null-move reduction once remaining depth exceeds this.
    pub null_deep_threshold: i32,
    /// Deepest remaining depth at which extended futility pruning applies.
    pub futility_max_depth: i32,
    /// Extended futility margin per ply of remaining depth.
    pub futility_margin: i32,
    /// Minimum remaining depth for late move reductions.
    pub lmr_min_depth: i32,
    /// Moves searched at full depth before reductions start.
    pub lmr_min_moves: usize,
    /// Half-width of the first aspiration window.
    pub aspiration_delta: i32,
    /// First depth searched with an aspiration window.
    pub aspiration_min_depth: u8,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            rfp_max_depth: 8,
            rfp_margin: 120,
            null_move: true,
            null_reduction: 2,
            null_deep_threshold: 6,
            futility_max_depth: 4,
            futility_margin: 150,
            lmr_min_depth: 3,
            lmr_min_moves: 3,
            aspiration_delta: 25,
            aspiration_min_depth: 4,
        }
    }
}

impl SearchParams {
    /// Plain alpha-beta: every forward-pruning and reduction technique off.
    ///
    /// Scores from this configuration are exact minimax values within the
    /// horizon, which makes it the reference in tests.
    pub fn unpruned() -> Self {
        Self {
            rfp_max_depth: 0,
            null_move: false,
            futility_max_depth: 0,
            lmr_min_depth: i32::MAX,
            aspiration_min_depth: u8::MAX,
            ..Self::default()
        }
    }

    /// Null-move reduction at `depth`.
    pub fn null_reduction_at(&self, depth: i32) -> i32 {
        if depth > self.null_deep_threshold {
            self.null_reduction + 1
        } else {
            self.null_reduction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SearchParams;

    #[test]
    fn null_reduction_deepens() {
        let params = SearchParams::default();
        assert_eq!(params.null_reduction_at(4), 2);
        assert_eq!(params.null_reduction_at(7), 3);
    }

    #[test]
    fn unpruned_disables_everything() {
        let params = SearchParams::unpruned();
        assert!(!params.null_move);
        assert_eq!(params.rfp_max_depth, 0);
        assert_eq!(params.futility_max_depth, 0);
        assert_eq!(params.rfp_margin, SearchParams::default().rfp_margin);
    }
}
