//! Proptest strategies for coralpkg domain types.

use coralpkg_version::Version;
use proptest::prelude::*;
use std::str::FromStr;

/// A valid package name: ASCII, no whitespace, 1-32 characters.
pub fn package_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,31}"
}

/// A valid version string of the shape this crate's grammar accepts:
/// dot-separated `NUMBER[LETTER]` segments, optionally followed by a
/// `_suffix` tail.
pub fn version_string() -> impl Strategy<Value = String> {
    prop::collection::vec(0u32..1000, 1..4).prop_map(|segments| {
        segments.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
    })
}

/// A parsed [`Version`], built from [`version_string`].
pub fn version() -> impl Strategy<Value = Version> {
    version_string().prop_map(|s| Version::from_str(&s).expect("strategy only emits valid versions"))
}

/// A distro release number as used alongside a [`Version`].
pub fn release() -> impl Strategy<Value = u32> {
    1u32..1000
}

proptest! {
    #[test]
    fn generated_versions_parse(v in version_string()) {
        Version::from_str(&v).unwrap();
    }

    #[test]
    fn version_equals_itself(v in version()) {
        prop_assert_eq!(v.clone(), v);
    }
}
