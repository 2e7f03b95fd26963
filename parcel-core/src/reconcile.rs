//! Set difference between the ids a user wants and the ids a layer holds.

use std::collections::BTreeSet;

/// Additions and deletions that bring a layer in line with the desired ids.
///
/// `to_add`, `to_delete` and `unchanged` are pairwise disjoint and together
/// cover every id from either input exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconciliationPlan {
    /// Desired ids missing from the layer.
    pub to_add: BTreeSet<String>,
    /// Layer ids no longer desired.
    pub to_delete: BTreeSet<String>,
    /// Ids present on both sides; left untouched.
    pub unchanged: BTreeSet<String>,
}

impl ReconciliationPlan {
    /// Whether applying the plan would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }
}

/// Compute `desired − existing` and `existing − desired`.
///
/// Comparison is exact string equality. The iteration order of the
/// resulting sets carries no meaning.
#[must_use]
pub fn reconcile(desired: &BTreeSet<String>, existing: &BTreeSet<String>) -> ReconciliationPlan {
    ReconciliationPlan {
        to_add: desired.difference(existing).cloned().collect(),
        to_delete: existing.difference(desired).cloned().collect(),
        unchanged: desired.intersection(existing).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| (*id).to_owned()).collect()
    }

    #[rstest]
    fn computes_additions_and_deletions() {
        let plan = reconcile(&set(&["14-123", "14-124"]), &set(&["14-124", "14-999"]));
        assert_eq!(plan.to_add, set(&["14-123"]));
        assert_eq!(plan.to_delete, set(&["14-999"]));
        assert_eq!(plan.unchanged, set(&["14-124"]));
    }

    #[rstest]
    fn matching_sets_plan_nothing() {
        let ids = set(&["1-1", "1-2"]);
        let plan = reconcile(&ids, &ids);
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, ids);
    }

    #[rstest]
    #[case(&[], &["1-1"], &[], &["1-1"])]
    #[case(&["1-1"], &[], &["1-1"], &[])]
    #[case(&[], &[], &[], &[])]
    fn handles_empty_sides(
        #[case] desired: &[&str],
        #[case] existing: &[&str],
        #[case] to_add: &[&str],
        #[case] to_delete: &[&str],
    ) {
        let plan = reconcile(&set(desired), &set(existing));
        assert_eq!(plan.to_add, set(to_add));
        assert_eq!(plan.to_delete, set(to_delete));
    }

    #[rstest]
    fn comparison_is_exact() {
        let plan = reconcile(&set(&["7-1"]), &set(&["0007-1"]));
        assert_eq!(plan.to_add, set(&["7-1"]));
        assert_eq!(plan.to_delete, set(&["0007-1"]));
    }

    #[rstest]
    fn blank_entries_are_reconciled_like_any_other() {
        let plan = reconcile(&set(&["", "1-1"]), &set(&["1-1"]));
        assert_eq!(plan.to_add, set(&[""]));
    }
}
