//! `plan_upgrade` and `upgrade_base`: expand a seed set into an upgrade
//! plan, with the extra resolvable-conflict, broken-revdep, and
//! update-action rules install expansion doesn't need.

use crate::install::{finish_order, repair_broken_revdeps};
use crate::types::{PackageView, Plan, ResolveError};
use coralpkg_core::UpdateAction;
use coralpkg_graph::Digraph;
use coralpkg_repository::ReplaceSpec;
use std::collections::{HashSet, VecDeque};

fn is_upgradable(db: &dyn PackageView, name: &str) -> bool {
    let (Some(installed), Some(candidate)) = (db.installed_revision(name), db.repo_record(name))
    else {
        return false;
    };
    candidate.revision() > installed
}

pub fn plan_upgrade(
    names: &[String],
    replaces: &[ReplaceSpec],
    db: &dyn PackageView,
) -> Result<Plan, ResolveError> {
    let mut graph: Digraph<String> = Digraph::new();
    let mut worklist: VecDeque<String> = VecDeque::new();
    let mut chosen: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut seed = |graph: &mut Digraph<String>, worklist: &mut VecDeque<String>, name: &str| {
        if seen.insert(name.to_string()) {
            graph.add_vertex(name.to_string(), ());
            worklist.push_back(name.to_string());
        }
    };

    for name in names {
        if is_upgradable(db, name) {
            seed(&mut graph, &mut worklist, name);
        }
    }
    for spec in replaces {
        if db.is_installed(&spec.from) {
            seed(&mut graph, &mut worklist, &spec.from);
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
                    graph.add_edge(x.clone(), target.clone(), ());
                    seed(&mut graph, &mut worklist, &target);
                }
                _ => return Err(ResolveError::UnsatisfiedDependency(x.clone(), dep.clone())),
            }
        }

        // Resolvable-conflict upgrade: a conflicting installed package
        // whose repo revision no longer conflicts gets pulled in too.
        for conflict in &record.conflicts {
            let p = conflict.target_name().to_string();
            let Some(installed) = db.installed_revision(&p) else {
                continue;
            };
            if !conflict.satisfies(&p, &installed) {
                continue;
            }
            if let Some(candidate) = db.repo_record(&p) {
                if !conflict.satisfies(&p, &candidate.revision()) {
                    graph.add_edge(x.clone(), p.clone(), ());
                    seed(&mut graph, &mut worklist, &p);
                }
            }
        }

        // Update-action propagation: a declared reverseDependencyUpdate
        // pulls in every upgradable installed revdep of its targets.
        if let Some(installed) = db.installed_revision(&x) {
            for entry in &record.update_history {
                if entry.release <= installed.release || entry.release > record.release {
                    continue;
                }
                if let Some(UpdateAction::ReverseDependencyUpdate(targets)) = &entry.action {
                    for target in targets {
                        for (rev_name, _) in db.installed_rev_deps(target) {
                            if is_upgradable(db, &rev_name) {
                                seed(&mut graph, &mut worklist, &rev_name);
                            }
                        }
                    }
                }
            }
        }
    }

    repair_broken_revdeps(&mut graph, &mut worklist, &chosen, db);
    while let Some(x) = worklist.pop_front() {
        if seen.insert(x.clone()) {
            chosen.push(x);
        }
    }

    let order = finish_order(&graph, db.bootstrap_package())?;
    Ok(Plan { graph, order })
}

/// Augments `plan` with every `system.base` component package that is
/// either not installed (install it) or upgradable (upgrade it), minus
/// names in `excludes`, so a system can never drift into an incoherent
/// base set.
#[must_use]
pub fn upgrade_base(mut plan: Plan, db: &dyn PackageView, excludes: &HashSet<String>) -> Plan {
    for name in db.base_component() {
        if excludes.contains(&name) {
            continue;
        }
        let needs_action = !db.is_installed(&name) || is_upgradable(db, &name);
        if needs_action && !plan.graph.has_vertex(&name) {
            plan.graph.add_vertex(name.clone(), ());
            plan.order.push(name);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::FakeView;

    #[test]
    fn seeds_only_upgradable_names() {
        let db = FakeView::new().repo("app", &[]).installed("stable");
        let plan = plan_upgrade(&["app".to_string(), "stable".to_string()], &[], &db).unwrap();
        assert!(plan.order.is_empty());
    }

    #[test]
    fn upgrade_base_adds_missing_base_packages() {
        let db = FakeView::new().repo("app", &[]).base(&["baselayout"]);
        let plan = plan_upgrade(&[], &[], &db).unwrap();
        let plan = upgrade_base(plan, &db, &Default::default());
        assert!(plan.order.contains(&"baselayout".to_string()));
    }
}
