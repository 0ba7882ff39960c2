//! Workspace root crate. Carries no code of its own; it exists to host
//! `tests/integration_tests.rs`, which exercises the `coralpkg-*` crates
//! together end to end.
