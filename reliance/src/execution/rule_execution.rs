//! Interface to the component that applies a single rule.

use crate::model::Rule;

/// Applies single rules to a fact store that is opaque to the scheduler.
pub trait RuleExecutor {
    /// Apply `rule` once, using `iteration` as the timestamp of the new facts.
    ///
    /// Returns `true` if new facts were derived.
    fn fire(&mut self, rule: &Rule, iteration: usize) -> bool;
}

impl<F> RuleExecutor for F
where
    F: FnMut(&Rule, usize) -> bool,
{
    fn fire(&mut self, rule: &Rule, iteration: usize) -> bool {
        self(rule, iteration)
    }
}
