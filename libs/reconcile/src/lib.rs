//! Reconciliation loop primitives.
//!
//! This library provides helpers for reconciliation loops that converge a
//! set of running instances to a set of observed entries. Key concepts:
//!
//! - **Observed state**: The entries that should have an instance (for the
//!   mock agent, the directory listing of the watched root).
//! - **Running state**: The keys that currently have an instance.
//! - **Convergence**: Starting missing instances and stopping stale ones.
//!
//! # Invariants
//!
//! - Planning is pure: the same inputs always produce the same plan
//! - Applying a plan to its inputs yields running == observed
//! - A plan never both starts and stops the same key

use std::collections::BTreeSet;

/// The actions one reconciliation pass must take.
///
/// Keys are kept sorted so that passes act (and log) in a stable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan<K: Ord> {
    /// Observed keys with no running instance.
    pub to_start: Vec<K>,

    /// Running keys no longer observed.
    pub to_stop: Vec<K>,
}

impl<K: Ord> Default for ReconcilePlan<K> {
    fn default() -> Self {
        Self {
            to_start: Vec::new(),
            to_stop: Vec::new(),
        }
    }
}

impl<K: Ord + Clone> ReconcilePlan<K> {
    /// Diff the running keys against the observed keys.
    pub fn compute<'a, R, O>(running: R, observed: O) -> Self
    where
        K: 'a,
        R: IntoIterator<Item = &'a K>,
        O: IntoIterator<Item = &'a K>,
    {
        let running: BTreeSet<&K> = running.into_iter().collect();
        let observed: BTreeSet<&K> = observed.into_iter().collect();

        let to_start = observed
            .difference(&running)
            .map(|k| (*k).clone())
            .collect();
        let to_stop = running
            .difference(&observed)
            .map(|k| (*k).clone())
            .collect();

        Self { to_start, to_stop }
    }
}

impl<K: Ord> ReconcilePlan<K> {
    /// Returns true if the plan has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.to_start.is_empty() && self.to_stop.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case::empty(&[], &[], &[], &[])]
    #[case::fresh(&[], &["x", "y"], &["x", "y"], &[])]
    #[case::removed(&["x", "y"], &["y"], &[], &["x"])]
    #[case::swap(&["a"], &["b"], &["b"], &["a"])]
    #[case::steady(&["a", "b"], &["b", "a"], &[], &[])]
    fn test_compute(
        #[case] running: &[&str],
        #[case] observed: &[&str],
        #[case] start: &[&str],
        #[case] stop: &[&str],
    ) {
        let running = keys(running);
        let observed = keys(observed);

        let plan = ReconcilePlan::compute(&running, &observed);

        assert_eq!(plan.to_start, keys(start));
        assert_eq!(plan.to_stop, keys(stop));
    }

    #[test]
    fn test_duplicates_collapse() {
        let running: Vec<String> = vec![];
        let observed = keys(&["x", "x"]);

        let plan = ReconcilePlan::compute(&running, &observed);
        assert_eq!(plan.to_start, keys(&["x"]));
    }

    #[test]
    fn test_is_empty() {
        let converged: ReconcilePlan<String> = ReconcilePlan::default();
        assert!(converged.is_empty());

        let observed = keys(&["x"]);
        let plan = ReconcilePlan::compute(&Vec::new(), &observed);
        assert!(!plan.is_empty());
        assert!(ReconcilePlan::compute(&observed, &observed).is_empty());
    }
}
