//! Random package data generators, for tests that want many distinct
//! packages without hand-writing each one.

use coralpkg_core::domain::{PackageId, PackageRecord};
use coralpkg_version::Version;
use rand::Rng;
use std::str::FromStr;

/// A random lowercase-ASCII package name, `prefix-NNNN`.
#[must_use]
pub fn random_package_name(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{prefix}-{suffix:06}")
}

/// A random `MAJOR.MINOR.PATCH` version string.
#[must_use]
pub fn random_version_string() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{}.{}.{}",
        rng.gen_range(0..20),
        rng.gen_range(0..20),
        rng.gen_range(0..20)
    )
}

/// A package record with a random name and version, no dependencies.
#[must_use]
pub fn random_package(prefix: &str) -> PackageRecord {
    let name = random_package_name(prefix);
    let version = random_version_string();
    PackageRecord {
        name: PackageId::new(name.clone()).expect("generated name is valid"),
        version: Version::from_str(&version).expect("generated version is valid"),
        release: rand::thread_rng().gen_range(1..10),
        distro_id: "coral-2024".to_string(),
        arch: "x86_64".to_string(),
        deps: Vec::new(),
        conflicts: Vec::new(),
        replaces: Vec::new(),
        provides: Vec::new(),
        file_list_uri: format!("{name}/files.xml"),
        package_uri: format!("{name}/{name}-{version}.coral"),
        package_hash: "0".repeat(64),
        installed_size: rand::thread_rng().gen_range(1_024..1_048_576),
        deltas: Default::default(),
        update_history: Vec::new(),
    }
}

/// `count` random, mutually independent packages sharing `prefix`.
#[must_use]
pub fn random_packages(prefix: &str, count: usize) -> Vec<PackageRecord> {
    (0..count).map(|_| random_package(prefix)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_packages_have_distinct_names() {
        let packages = random_packages("pkg", 20);
        let mut names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 20);
    }
}
