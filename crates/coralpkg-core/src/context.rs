//! The `Context` value: the single place mutable process-wide state lives,
//! constructed once at the CLI entry point and threaded down instead of
//! relying on global singletons.

use crate::progress::ProgressSink;
use crate::Result;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fetches a single URI to a destination path. Implemented by
/// `coralpkg-fetch`; test doubles can stub this trivially.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, uri: &str, dest: &Path) -> Result<()>;
}

/// Verifies a detached or embedded signature over an index or package.
/// Scoped out of this implementation (spec treats it as opaque); the
/// default implementation always accepts.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, path: &Path) -> bool;
}

/// Invokes whatever system-configuration trigger mechanism exists after a
/// transaction completes. Scoped out of this implementation; the default
/// implementation is a no-op.
pub trait SystemConfigTrigger: Send + Sync {
    fn apply(&self, pending: &[String]);
}

/// Always-accept signature verifier, used when no real verification
/// backend is configured.
#[derive(Debug, Default)]
pub struct NullSignatureVerifier;

impl SignatureVerifier for NullSignatureVerifier {
    fn verify(&self, _path: &Path) -> bool {
        true
    }
}

/// No-op system-configuration trigger.
#[derive(Debug, Default)]
pub struct NullSystemConfigTrigger;

impl SystemConfigTrigger for NullSystemConfigTrigger {
    fn apply(&self, _pending: &[String]) {}
}

/// An RAII guard over the single process-wide mutual-exclusion lock.
/// Mutating operations (install/upgrade/remove/configure) hold one of
/// these for their duration; read-only operations (`info`, `search`,
/// `list`) bypass it entirely. Released automatically on drop, including
/// when the holder unwinds via `?`.
pub struct GlobalLockGuard {
    _inner: ArcMutexGuard<RawMutex, ()>,
}

/// Process-wide state: install root, database handles, and the external
/// collaborator trait objects. Constructed once in the CLI entry point and
/// passed by reference to planner/apply/resolver calls.
pub struct Context {
    pub root: PathBuf,
    pub cache_dir: PathBuf,
    lock: Arc<Mutex<()>>,
    pub fetcher: Arc<dyn Fetcher>,
    pub signature_verifier: Arc<dyn SignatureVerifier>,
    pub system_config: Arc<dyn SystemConfigTrigger>,
    pub progress: Arc<dyn ProgressSink>,
}

impl Context {
    #[must_use]
    pub fn new(
        root: PathBuf,
        cache_dir: PathBuf,
        fetcher: Arc<dyn Fetcher>,
        signature_verifier: Arc<dyn SignatureVerifier>,
        system_config: Arc<dyn SystemConfigTrigger>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            root,
            cache_dir,
            lock: Arc::new(Mutex::new(())),
            fetcher,
            signature_verifier,
            system_config,
            progress,
        }
    }

    /// Acquire the process-wide mutual-exclusion lock. Blocks until the
    /// lock is free; held until the returned guard is dropped.
    #[must_use]
    pub fn acquire_lock(&self) -> GlobalLockGuard {
        GlobalLockGuard {
            _inner: Arc::clone(&self.lock).lock_arc(),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}
