//! The fetch contract: `fetch(uri, dest_path) -> Result<(), FetchError>`.
//!
//! Downloads a single package or repository-index artifact, resuming via
//! HTTP Range where the server supports it, honoring a bandwidth limit and
//! HTTP/HTTPS proxy configuration, and retrying transient failures with
//! exponential backoff. The underlying implementation is async (`reqwest`
//! over a small current-thread `tokio` runtime) but the contract exposed to
//! callers — and to [`coralpkg_core::Fetcher`] — is synchronous.

pub mod client;
pub mod error;
pub mod retry;
pub mod throttle;

pub use client::{FetchConfig, HttpFetcher};
pub use error::{FetchError, Result};
pub use retry::RetryConfig;
pub use throttle::BandwidthThrottler;
