//! `plan_install`: expand a seed set of package names into a
//! dependency-ordered install plan.

use crate::types::{PackageView, Plan, ResolveError};
use coralpkg_graph::Digraph;
use std::collections::VecDeque;

/// Seeds the graph with `names`, then repeatedly expands each newly
/// added vertex along its repo revision's runtime dependencies: already
/// satisfied by something installed, satisfied by a repo candidate (add
/// an edge to it), or unsatisfiable (an error).
///
/// Also walks reverse dependencies of every newly chosen package: if
/// pulling in a repo revision would break an installed revdep's recorded
/// relation, that revdep is pulled into the plan too, so the expansion
/// never silently breaks something already on the system.
pub fn plan_install(names: &[String], db: &dyn PackageView) -> Result<Plan, ResolveError> {
    let mut graph: Digraph<String> = Digraph::new();
    let mut worklist: VecDeque<String> = VecDeque::new();
    let mut chosen: Vec<String> = Vec::new();

    for name in names {
        if !graph.has_vertex(name) {
            graph.add_vertex(name.clone(), ());
            worklist.push_back(name.clone());
        }
    }

    while let Some(x) = worklist.pop_front() {
        chosen.push(x.clone());
        let Some(record) = db.repo_record(&x) else {
            continue;
        };
        for dep in &record.deps {
            let target = dep.target_name().to_string();

            if let Some(installed) = db.installed_revision(&target) {
                if dep.satisfies(&target, &installed) {
                    continue;
                }
            }

            match db.repo_record(&target) {
                Some(candidate) if dep.satisfies(&target, &candidate.revision()) => {
                    let newly_added = !graph.has_vertex(&target);
                    graph.add_edge(x.clone(), target.clone(), ());
                    if newly_added {
                        worklist.push_back(target);
                    }
                }
                _ => return Err(ResolveError::UnsatisfiedDependency(x.clone(), dep.clone())),
            }
        }
    }

    repair_broken_revdeps(&mut graph, &mut worklist, &chosen, db);
    while let Some(x) = worklist.pop_front() {
        if !chosen.contains(&x) {
            chosen.push(x);
        }
    }

    let order = finish_order(&graph, db.bootstrap_package())?;
    Ok(Plan { graph, order })
}

/// For each chosen package's dependency targets, check whether the
/// chosen repo revision still satisfies the relation recorded by every
/// installed reverse dependency; if not, pull that reverse dependency
/// into the plan so it gets rebuilt against the new revision.
pub(crate) fn repair_broken_revdeps(
    graph: &mut Digraph<String>,
    worklist: &mut VecDeque<String>,
    chosen: &[String],
    db: &dyn PackageView,
) {
    for name in chosen {
        let Some(candidate) = db.repo_record(name) else {
            continue;
        };
        for (rev_name, relation) in db.installed_rev_deps(name) {
            if db.installed_revision(&rev_name).is_none() {
                continue;
            }
            if !relation.satisfies(name, &candidate.revision()) && !graph.has_vertex(&rev_name) {
                graph.add_vertex(rev_name.clone(), ());
                graph.add_edge(rev_name.clone(), name.clone(), ());
                worklist.push_back(rev_name);
            }
        }
    }
}

/// Topologically sorts and reverses so dependencies precede dependents,
/// then moves `bootstrap` to the very end if present — it must be
/// installed last relative to everything else in the plan on a fresh
/// system, per the configured bootstrap package.
pub(crate) fn finish_order(
    graph: &Digraph<String>,
    bootstrap: &str,
) -> Result<Vec<String>, ResolveError> {
    let mut order = graph
        .topological_sort()
        .map_err(|c| ResolveError::Cycle(c.0))?;
    order.reverse();
    if let Some(pos) = order.iter().position(|n| n == bootstrap) {
        let pkg = order.remove(pos);
        order.push(pkg);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::FakeView;

    #[test]
    fn expands_transitive_deps_in_dependency_first_order() {
        let db = FakeView::new()
            .repo("app", &["libfoo"])
            .repo("libfoo", &["libbar"])
            .repo("libbar", &[]);
        let plan = plan_install(&["app".to_string()], &db).unwrap();
        let pos = |n: &str| plan.order.iter().position(|x| x == n).unwrap();
        assert!(pos("libbar") < pos("libfoo"));
        assert!(pos("libfoo") < pos("app"));
    }

    #[test]
    fn already_installed_dependency_short_circuits_expansion() {
        let db = FakeView::new()
            .repo("app", &["libfoo"])
            .installed("libfoo");
        let plan = plan_install(&["app".to_string()], &db).unwrap();
        assert_eq!(plan.order, vec!["app".to_string()]);
    }

    #[test]
    fn unsatisfiable_dependency_errors() {
        let db = FakeView::new().repo("app", &["ghost"]);
        let err = plan_install(&["app".to_string()], &db).unwrap_err();
        assert!(matches!(err, ResolveError::UnsatisfiedDependency(ref p, _) if p == "app"));
    }

    #[test]
    fn bootstrap_package_sorts_last() {
        let db = FakeView::new()
            .repo("app", &["baselayout"])
            .repo("baselayout", &[])
            .bootstrap("baselayout");
        let plan = plan_install(&["app".to_string()], &db).unwrap();
        assert_eq!(plan.order.last().unwrap(), "baselayout");
    }
}
