//! Search control: stop flag, clock and node limits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Nodes between clock reads.
const POLL_MASK: u64 = 1023;

/// Decides when a search must stop.
///
/// The hard checks in [`should_stop`](Self::should_stop) run inside the
/// tree and abort mid-iteration. The soft check in
/// [`should_stop_iterating`](Self::should_stop_iterating) runs between
/// iterative-deepening depths.
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
    node_limit: Option<u64>,
}

impl SearchControl {
    /// No clock; only the stop flag or a node limit ends the search.
    pub fn new_infinite(stopped: Arc<AtomicBool>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            soft_limit: None,
            hard_limit: None,
            node_limit: None,
        }
    }

    /// Clock starts now with the given soft and hard limits.
    pub fn new_timed(stopped: Arc<AtomicBool>, soft: Duration, hard: Duration) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            soft_limit: Some(soft),
            hard_limit: Some(hard.max(soft)),
            node_limit: None,
        }
    }

    /// Also stop once `nodes` have been searched.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    /// Whether the search must abort now.
    ///
    /// The stop flag and node limit are checked every call, the clock every
    /// 1024 nodes. Once a limit fires the stop flag is raised, so later
    /// calls return immediately.
    pub fn should_stop(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if let Some(limit) = self.node_limit
            && nodes >= limit
        {
            self.stopped.store(true, Ordering::Relaxed);
            return true;
        }

        if nodes & POLL_MASK != 0 {
            return false;
        }

        if let Some(hard) = self.hard_limit
            && self.elapsed() >= hard
        {
            self.stopped.store(true, Ordering::Relaxed);
            return true;
        }

        false
    }

    /// Whether another iterative-deepening depth should be skipped.
    pub fn should_stop_iterating(&self) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        self.soft_limit.is_some_and(|soft| self.elapsed() >= soft)
    }

    /// Time since the control was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The shared stop flag.
    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stopped
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::SearchControl;

    #[test]
    fn infinite_only_stops_on_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(Arc::clone(&flag));
        assert!(!control.should_stop(0));
        assert!(!control.should_stop_iterating());

        flag.store(true, Ordering::Relaxed);
        assert!(control.should_stop(1));
        assert!(control.should_stop_iterating());
    }

    #[test]
    fn node_limit_raises_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(Arc::clone(&flag)).with_node_limit(500);
        assert!(!control.should_stop(499));
        assert!(control.should_stop(500));
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn expired_hard_limit_stops_on_poll() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_timed(flag, Duration::ZERO, Duration::ZERO);
        // Off-poll node counts skip the clock.
        assert!(!control.should_stop(1));
        assert!(control.should_stop(1024));
        assert!(control.should_stop_iterating());
    }

    #[test]
    fn hard_never_below_soft() {
        let flag = Arc::new(AtomicBool::new(false));
        let control =
            SearchControl::new_timed(flag, Duration::from_secs(60), Duration::from_millis(1));
        assert!(!control.should_stop(0));
    }
}
