//! `check_conflicts`: split an ordered plan's implied conflicts into
//! internal (an error) and external (for the caller to resolve before
//! apply).

use crate::types::{ConflictReport, PackageView};
use std::collections::HashSet;

/// Checks every declared conflict of every package in `order` against
/// the rest of `order` (internal) and against everything else currently
/// installed (external).
#[must_use]
pub fn check_conflicts(order: &[String], db: &dyn PackageView) -> ConflictReport {
    let in_plan: HashSet<&String> = order.iter().collect();
    let mut report = ConflictReport::default();

    for name in order {
        let Some(record) = db.repo_record(name).or_else(|| db.installed_record(name)) else {
            continue;
        };
        for conflict in &record.conflicts {
            let target = conflict.target_name();

            if let Some(other) = order.iter().find(|n| n.as_str() == target) {
                if let Some(rev) = db
                    .repo_record(other)
                    .or_else(|| db.installed_record(other))
                    .map(|r| r.revision())
                {
                    if conflict.satisfies(target, &rev) {
                        let pair = if name < other {
                            (name.clone(), other.clone())
                        } else {
                            (other.clone(), name.clone())
                        };
                        if !report.internal.contains(&pair) {
                            report.internal.push(pair);
                        }
                    }
                }
                continue;
            }

            if in_plan.contains(&target.to_string()) {
                continue;
            }
            if let Some(rev) = db.installed_revision(target) {
                if conflict.satisfies(target, &rev) && !report.external.contains(&target.to_string())
                {
                    report.external.push(target.to_string());
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::FakeView;

    #[test]
    fn internal_conflict_within_plan_is_reported() {
        let db = FakeView::new()
            .repo("a", &[])
            .repo("b", &[])
            .conflicts("a", "b");
        let report = check_conflicts(&["a".to_string(), "b".to_string()], &db);
        assert_eq!(report.internal.len(), 1);
        assert!(report.external.is_empty());
    }

    #[test]
    fn external_conflict_with_installed_package_is_reported() {
        let db = FakeView::new()
            .repo("a", &[])
            .installed("b")
            .conflicts("a", "b");
        let report = check_conflicts(&["a".to_string()], &db);
        assert_eq!(report.external, vec!["b".to_string()]);
    }

    #[test]
    fn no_conflicts_yields_clean_report() {
        let db = FakeView::new().repo("a", &[]);
        let report = check_conflicts(&["a".to_string()], &db);
        assert!(report.is_clean());
    }
}
