//! Dependency resolution and transaction planning: turns a user request
//! (install/upgrade/remove these names) into a dependency-ordered
//! [`Plan`] against a [`PackageView`] of installed and repository state.
//!
//! Generalizes the donor's closure/expansion loop and conflict-detection
//! structure from Composer's SAT-style resolution to the iterative
//! relation-satisfaction walk this package manager's dependency model
//! calls for; rule fidelity follows the reference distro tooling's
//! install/upgrade/remove/helper operations directly.

mod conflicts;
mod install;
mod remove;
#[cfg(test)]
mod tests_support;
pub mod types;
mod upgrade;

pub use conflicts::check_conflicts;
pub use install::plan_install;
pub use remove::{plan_autoremove, plan_autoremove_all, plan_remove};
pub use types::{ConflictReport, PackageView, Plan, ResolveError};
pub use upgrade::{plan_upgrade, upgrade_base};
