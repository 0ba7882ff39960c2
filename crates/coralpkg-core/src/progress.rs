//! Progress reporting contract shared by fetch and apply.
//!
//! `ProgressSink` is a plain trait rather than a captured closure so a
//! `Context` can hold `Arc<dyn ProgressSink>` and both the fetch and apply
//! engines can report through the same handle without owning it.

use std::fmt;

/// A single progress event emitted during fetch or apply.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A package-level operation started (`op` is e.g. "fetching", "installing").
    Started { package: String, op: String },
    /// Bytes transferred for a fetch in progress.
    Bytes { package: String, done: u64, total: Option<u64> },
    /// A package-level operation finished.
    Finished { package: String, op: String },
    /// A warning the user should see but that does not abort the transaction.
    Warning(String),
}

/// Receives [`ProgressEvent`]s as they happen. Implementations must be
/// cheap and non-blocking; the CLI's implementation renders a progress
/// bar, the test double just records events.
pub trait ProgressSink: Send + Sync + fmt::Debug {
    fn emit(&self, event: ProgressEvent);
}

/// A [`ProgressSink`] that discards every event, used where no user is
/// watching (library callers, non-interactive scripts).
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}
