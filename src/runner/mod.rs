//! Refinement runner - the review-revise loop.
//!
//! This module provides:
//! - RefinementLoop, which drives a session from caption to acceptance
//! - RefinementConfig for the iteration guard and service retry policy
//! - RefinementOutcome describing an accepted run

mod refinement;

pub use refinement::{RefinementConfig, RefinementLoop, RefinementOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unbounded_single_attempt() {
        let config = RefinementConfig::default();
        assert!(config.max_iterations.is_none());
        assert_eq!(config.render_policy.max_attempts, 1);
    }
}
