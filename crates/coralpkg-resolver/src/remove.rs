//! `plan_remove`, `plan_autoremove`, and `plan_autoremove_all`: expand a
//! seed set by reverse dependency, and compute orphaned automatic
//! installs.

use crate::types::{PackageView, Plan, ResolveError};
use coralpkg_graph::Digraph;
use std::collections::{HashSet, VecDeque};

/// Seeds `A`, refusing any seed in `system.base` unless `ignore_safety`
/// is set, then expands by reverse dependency: a revdep is pulled in
/// only if nothing installed outside the growing remove set still
/// satisfies the relation it had on the package being removed.
pub fn plan_remove(
    names: &[String],
    ignore_safety: bool,
    db: &dyn PackageView,
) -> Result<Plan, ResolveError> {
    if !ignore_safety {
        let base: HashSet<String> = db.base_component().into_iter().collect();
        let protected: Vec<String> = names.iter().filter(|n| base.contains(*n)).cloned().collect();
        if !protected.is_empty() {
            return Err(ResolveError::ProtectedRemoval(protected));
        }
    }

    let mut graph: Digraph<String> = Digraph::new();
    let mut set: HashSet<String> = HashSet::new();
    let mut worklist: VecDeque<String> = VecDeque::new();

    for name in names {
        if set.insert(name.clone()) {
            graph.add_vertex(name.clone(), ());
            worklist.push_back(name.clone());
        }
    }

    while let Some(x) = worklist.pop_front() {
        for (rev_name, relation) in db.installed_rev_deps(&x) {
            if !db.is_installed(&rev_name) {
                continue;
            }
            let Some(removed_revision) = db.installed_revision(&x) else {
                continue;
            };
            if !relation.satisfies(&x, &removed_revision) {
                continue;
            }
            let still_satisfied = db
                .installed_names()
                .iter()
                .filter(|n| *n != &x && !set.contains(*n))
                .filter_map(|n| db.installed_revision(n).map(|r| (n.clone(), r)))
                .any(|(n, rev)| relation.satisfies(&n, &rev));
            if still_satisfied {
                continue;
            }
            graph.add_edge(rev_name.clone(), x.clone(), ());
            if set.insert(rev_name.clone()) {
                worklist.push_back(rev_name);
            }
        }
    }

    // Apply order: dependents before dependencies, i.e. as returned by
    // topological_sort (no reversal, unlike install).
    let order = graph.topological_sort().map_err(|c| ResolveError::Cycle(c.0))?;
    Ok(Plan { graph, order })
}

/// Every package an automatic install `p` is reachable from, following
/// runtime dependency edges outward from `roots` (the non-automatic,
/// explicitly installed set), used to decide whether `p` still has a
/// reason to exist.
fn reachable_from_explicit(db: &dyn PackageView) -> HashSet<String> {
    let automatic: HashSet<String> = db.automatic_names().into_iter().collect();
    let roots: Vec<String> = db
        .installed_names()
        .into_iter()
        .filter(|n| !automatic.contains(n))
        .collect();

    let mut reached: HashSet<String> = HashSet::new();
    let mut worklist: VecDeque<String> = roots.into_iter().collect();
    while let Some(name) = worklist.pop_front() {
        if !reached.insert(name.clone()) {
            continue;
        }
        let Some(record) = db.installed_record(&name) else {
            continue;
        };
        for dep in &record.deps {
            worklist.push_back(dep.target_name().to_string());
        }
    }
    reached
}

/// Packages in the current automatic set that nothing explicitly
/// installed transitively depends on.
fn current_orphans(db: &dyn PackageView) -> HashSet<String> {
    let reached = reachable_from_explicit(db);
    db.automatic_names()
        .into_iter()
        .filter(|n| !reached.contains(n))
        .collect()
}

/// Removes `A`, then greedily folds in any current orphan that the
/// removal of `A` alone pulls loose — found with a fixpoint loop over a
/// `HashSet`, never a recursive helper, since the orphan set can in
/// principle span the whole automatic install set.
pub fn plan_autoremove(names: &[String], db: &dyn PackageView) -> Result<Plan, ResolveError> {
    let seed = plan_remove(names, false, db)?;
    let mut set: HashSet<String> = seed.order.iter().cloned().collect();

    loop {
        let mut added_any = false;
        for orphan in current_orphans(db) {
            if !set.contains(&orphan) && would_become_orphan_without(&orphan, &set, db) {
                set.insert(orphan);
                added_any = true;
            }
        }
        if !added_any {
            break;
        }
    }

    build_remove_plan(set, db)
}

/// `true` iff every explicit-install path that still reaches `orphan`
/// passes exclusively through packages already in `removed`.
fn would_become_orphan_without(orphan: &str, removed: &HashSet<String>, db: &dyn PackageView) -> bool {
    let automatic: HashSet<String> = db.automatic_names().into_iter().collect();
    let roots: Vec<String> = db
        .installed_names()
        .into_iter()
        .filter(|n| !automatic.contains(n) && !removed.contains(n))
        .collect();

    let mut reached: HashSet<String> = HashSet::new();
    let mut worklist: VecDeque<String> = roots.into_iter().collect();
    while let Some(name) = worklist.pop_front() {
        if removed.contains(&name) || !reached.insert(name.clone()) {
            continue;
        }
        let Some(record) = db.installed_record(&name) else {
            continue;
        };
        for dep in &record.deps {
            worklist.push_back(dep.target_name().to_string());
        }
    }
    !reached.contains(orphan)
}

/// Every current orphan, as a standalone remove plan.
pub fn plan_autoremove_all(db: &dyn PackageView) -> Result<Plan, ResolveError> {
    build_remove_plan(current_orphans(db), db)
}

fn build_remove_plan(set: HashSet<String>, db: &dyn PackageView) -> Result<Plan, ResolveError> {
    let mut graph: Digraph<String> = Digraph::new();
    for name in &set {
        graph.add_vertex(name.clone(), ());
    }
    for name in &set {
        for (rev_name, relation) in db.installed_rev_deps(name) {
            if set.contains(&rev_name) {
                if let Some(rev) = db.installed_revision(name) {
                    if relation.satisfies(name, &rev) {
                        graph.add_edge(rev_name, name.clone(), ());
                    }
                }
            }
        }
    }
    let order = graph.topological_sort().map_err(|c| ResolveError::Cycle(c.0))?;
    Ok(Plan { graph, order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::FakeView;

    #[test]
    fn protected_base_package_is_refused_without_ignore_safety() {
        let db = FakeView::new().installed("base").base(&["base"]);
        let err = plan_remove(&["base".to_string()], false, &db).unwrap_err();
        assert!(matches!(err, ResolveError::ProtectedRemoval(_)));
    }

    #[test]
    fn ignore_safety_allows_removing_base_package() {
        let db = FakeView::new().installed("base").base(&["base"]);
        let plan = plan_remove(&["base".to_string()], true, &db).unwrap();
        assert_eq!(plan.order, vec!["base".to_string()]);
    }

    #[test]
    fn dependent_is_removed_before_its_dependency_order() {
        let db = FakeView::new()
            .installed("libfoo")
            .installed("app")
            .rev_dep("libfoo", "app");
        let plan = plan_remove(&["libfoo".to_string()], false, &db).unwrap();
        let pos = |n: &str| plan.order.iter().position(|x| x == n).unwrap();
        assert!(pos("app") < pos("libfoo"));
    }

    #[test]
    fn autoremove_all_returns_current_orphans() {
        let db = FakeView::new().automatic("libfoo");
        let plan = plan_autoremove_all(&db).unwrap();
        assert_eq!(plan.order, vec!["libfoo".to_string()]);
    }
}
