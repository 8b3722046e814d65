//! Terminal and time-limit conditions

/// Decides per-step termination and truncation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationChecker {
    max_steps: usize,
}

impl TerminationChecker {
    /// Create a checker with the given step limit
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    /// Step limit
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Whether a task-defined end condition holds
    pub fn is_terminated(&self, collided: bool, out_of_bounds: bool, reached_goal: bool) -> bool {
        collided || out_of_bounds || reached_goal
    }

    /// Whether the step limit has been reached
    pub fn is_truncated(&self, elapsed_steps: usize) -> bool {
        elapsed_steps >= self.max_steps
    }

    /// `(terminated, truncated)` for one agent at one step
    ///
    /// The two signals are independent and may both be true.
    pub fn check(
        &self,
        collided: bool,
        out_of_bounds: bool,
        reached_goal: bool,
        elapsed_steps: usize,
    ) -> (bool, bool) {
        (self.is_terminated(collided, out_of_bounds, reached_goal), self.is_truncated(elapsed_steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_boundary() {
        let checker = TerminationChecker::new(500);

        assert_eq!(checker.check(false, false, false, 499), (false, false));
        assert_eq!(checker.check(false, false, false, 500), (false, true));
        assert_eq!(checker.check(true, false, false, 500), (true, true));
    }

    #[test]
    fn test_terminal_conditions() {
        let checker = TerminationChecker::new(10);

        assert!(checker.is_terminated(true, false, false));
        assert!(checker.is_terminated(false, true, false));
        assert!(checker.is_terminated(false, false, true));
        assert!(!checker.is_terminated(false, false, false));
    }
}
