//! Time management: turn clock readings into search limits.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use sable_core::Color;

use crate::search::control::SearchControl;

/// Share of the clock kept back for transmission and process overhead.
const OVERHEAD: Duration = Duration::from_millis(10);

/// Moves the remaining clock is spread over when the controller gives no count.
const DEFAULT_MOVES_TO_GO: u32 = 30;

/// Clock state for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBudget {
    /// Time left on the clock.
    pub remaining: Duration,
    /// Increment added after each move.
    pub increment: Duration,
    /// Moves until the next time control, if the controller says.
    pub moves_to_go: Option<u32>,
}

impl TimeBudget {
    /// A budget with no increment.
    pub fn new(remaining: Duration) -> Self {
        Self {
            remaining,
            increment: Duration::ZERO,
            moves_to_go: None,
        }
    }

    /// Add a per-move increment.
    pub fn with_increment(mut self, increment: Duration) -> Self {
        self.increment = increment;
        self
    }
}

/// Soft and hard limits for one move.
///
/// Soft is when iterative deepening stops starting new depths; hard is when
/// a running iteration is abandoned.
///
/// | Term      | Value                                           |
/// |-----------|-------------------------------------------------|
/// | usable    | remaining minus 10 ms overhead                   |
/// | soft      | usable / moves_to_go (30 if unknown) + 3/4 inc   |
/// | hard      | 2 × usable / moves_to_go + inc                   |
/// | cap       | both limited to a quarter of usable              |
///
/// Hard never ends up below soft. A clock under 10 ms gets 1 ms for both.
pub fn compute_limits(budget: &TimeBudget) -> (Duration, Duration) {
    let one_ms = Duration::from_millis(1);
    if budget.remaining < OVERHEAD {
        return (one_ms, one_ms);
    }

    let usable = budget.remaining - OVERHEAD;
    let moves = budget.moves_to_go.unwrap_or(DEFAULT_MOVES_TO_GO).max(1);
    let cap = usable / 4;

    let soft = usable / moves + budget.increment * 3 / 4;
    let hard = usable * 2 / moves + budget.increment;

    let soft = soft.min(cap).max(one_ms);
    let hard = hard.min(cap).max(soft);
    (soft, hard)
}

/// Search limits as a match controller states them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GoLimits {
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Option<Duration>,
    pub binc: Option<Duration>,
    pub movestogo: Option<u32>,
    /// Exact time to spend on this move.
    pub movetime: Option<Duration>,
    /// Search until told to stop.
    pub infinite: bool,
    pub nodes: Option<u64>,
}

impl GoLimits {
    /// The clock of `side`, if any was given.
    pub fn budget_for(&self, side: Color) -> Option<TimeBudget> {
        let (remaining, increment) = match side {
            Color::White => (self.wtime, self.winc),
            Color::Black => (self.btime, self.binc),
        };
        remaining.map(|remaining| TimeBudget {
            remaining,
            increment: increment.unwrap_or(Duration::ZERO),
            moves_to_go: self.movestogo,
        })
    }
}

/// Build a [`SearchControl`] for `side` from controller limits.
///
/// Priority: `infinite`, then `movetime`, then the side's clock. With none
/// of them the search runs until depth, node limit, or `stop`.
pub fn control_from_go(limits: &GoLimits, side: Color, stopped: Arc<AtomicBool>) -> SearchControl {
    let control = if limits.infinite {
        SearchControl::new_infinite(stopped)
    } else if let Some(movetime) = limits.movetime {
        SearchControl::new_timed(stopped, movetime, movetime)
    } else if let Some(budget) = limits.budget_for(side) {
        let (soft, hard) = compute_limits(&budget);
        SearchControl::new_timed(stopped, soft, hard)
    } else {
        SearchControl::new_infinite(stopped)
    };

    match limits.nodes {
        Some(nodes) => control.with_node_limit(nodes),
        None => control,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use sable_core::Color;

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn sudden_death_uses_thirtieth_and_fifteenth() {
        let (soft, hard) = compute_limits(&TimeBudget::new(ms(60_010)));
        assert_eq!(soft, ms(2_000));
        assert_eq!(hard, ms(4_000));
    }

    #[test]
    fn increment_is_mostly_spent() {
        let budget = TimeBudget::new(ms(30_010)).with_increment(ms(400));
        let (soft, hard) = compute_limits(&budget);
        assert_eq!(soft, ms(1_000 + 300));
        assert_eq!(hard, ms(2_000 + 400));
    }

    #[test]
    fn moves_to_go_divides_clock() {
        let budget = TimeBudget {
            remaining: ms(10_010),
            increment: Duration::ZERO,
            moves_to_go: Some(10),
        };
        let (soft, hard) = compute_limits(&budget);
        assert_eq!(soft, ms(1_000));
        assert_eq!(hard, ms(2_000));
    }

    #[test]
    fn last_move_before_control_is_capped() {
        let budget = TimeBudget {
            remaining: ms(4_010),
            increment: Duration::ZERO,
            moves_to_go: Some(1),
        };
        let (soft, hard) = compute_limits(&budget);
        assert_eq!(soft, ms(1_000));
        assert_eq!(hard, ms(1_000));
    }

    #[test]
    fn tiny_clock_gets_one_millisecond() {
        let (soft, hard) = compute_limits(&TimeBudget::new(ms(5)));
        assert_eq!((soft, hard), (ms(1), ms(1)));
    }

    #[test]
    fn hard_never_below_soft() {
        for remaining in [10, 11, 50, 999, 12_345, 600_000] {
            for inc in [0, 1, 100, 5_000] {
                let budget = TimeBudget::new(ms(remaining)).with_increment(ms(inc));
                let (soft, hard) = compute_limits(&budget);
                assert!(hard >= soft, "{remaining}+{inc}: {soft:?} > {hard:?}");
                assert!(soft >= ms(1));
            }
        }
    }

    #[test]
    fn budget_picks_side_clock() {
        let limits = GoLimits {
            wtime: Some(ms(1_000)),
            btime: Some(ms(2_000)),
            winc: Some(ms(10)),
            binc: None,
            movestogo: Some(5),
            ..GoLimits::default()
        };
        let white = limits.budget_for(Color::White).unwrap();
        assert_eq!(white.remaining, ms(1_000));
        assert_eq!(white.increment, ms(10));
        let black = limits.budget_for(Color::Black).unwrap();
        assert_eq!(black.remaining, ms(2_000));
        assert_eq!(black.increment, Duration::ZERO);
        assert_eq!(black.moves_to_go, Some(5));

        assert!(GoLimits::default().budget_for(Color::White).is_none());
    }

    #[test]
    fn bare_go_is_unbounded_in_time() {
        let control = control_from_go(
            &GoLimits::default(),
            Color::White,
            Arc::new(AtomicBool::new(false)),
        );
        assert!(!control.should_stop(0));
        assert!(!control.should_stop_iterating());
    }

    #[test]
    fn zero_movetime_stops_immediately() {
        let limits = GoLimits {
            movetime: Some(Duration::ZERO),
            ..GoLimits::default()
        };
        let control = control_from_go(&limits, Color::Black, Arc::new(AtomicBool::new(false)));
        assert!(control.should_stop_iterating());
        assert!(control.should_stop(0));
    }

    #[test]
    fn node_limit_is_applied() {
        let limits = GoLimits {
            infinite: true,
            nodes: Some(100),
            ..GoLimits::default()
        };
        let control = control_from_go(&limits, Color::White, Arc::new(AtomicBool::new(false)));
        assert!(!control.should_stop(99));
        assert!(control.should_stop(100));
    }
}
