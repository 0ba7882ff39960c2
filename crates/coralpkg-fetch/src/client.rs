//! The `HttpFetcher`: a synchronous `fetch(uri, dest)` built on an async
//! `reqwest` client driven by a small current-thread `tokio` runtime owned
//! by the fetcher itself. Only one fetch runs at a time (the planner calls
//! `fetch` from a single thread of control), so the blocking file I/O used
//! while draining the response body never contends with other async work
//! on the runtime.

use crate::error::{FetchError, Result};
use crate::retry::{with_retry, RetryConfig};
use crate::throttle::BandwidthThrottler;
use futures_util::StreamExt;
use reqwest::header::RANGE;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Host-identity and policy knobs for the fetcher, mirroring the
/// `[general]` section of `coralpkg-config` without depending on that
/// crate directly — the caller (`coralpkg-cli`) is responsible for
/// translating a loaded `Config` into one of these.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// `0` means unlimited, matching `[general] bandwidth_limit`'s meaning.
    pub bandwidth_limit_kib_per_sec: u32,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("coralpkg/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            bandwidth_limit_kib_per_sec: 0,
            http_proxy: None,
            https_proxy: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Implements [`coralpkg_core::Fetcher`] with resumable, rate-limited,
/// retried HTTP downloads.
pub struct HttpFetcher {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    throttle: BandwidthThrottler,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// # Errors
    /// Returns [`FetchError::Io`] (used here as a catch-all construction
    /// failure) if the underlying `reqwest` client or `tokio` runtime
    /// cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .use_rustls_tls();

        if let Some(proxy) = &config.https_proxy {
            if let Ok(p) = reqwest::Proxy::https(proxy) {
                builder = builder.proxy(p);
            }
        }
        if let Some(proxy) = &config.http_proxy {
            if let Ok(p) = reqwest::Proxy::http(proxy) {
                builder = builder.proxy(p);
            }
        }

        let client = builder.build().map_err(|e| FetchError::Transient {
            uri: String::new(),
            retries: 0,
            message: format!("failed to build http client: {e}"),
        })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FetchError::Io {
                path: PathBuf::new(),
                source: e,
            })?;

        let bandwidth_bytes = if config.bandwidth_limit_kib_per_sec == 0 {
            None
        } else {
            Some(u64::from(config.bandwidth_limit_kib_per_sec) * 1024)
        };

        Ok(Self {
            client,
            runtime,
            throttle: BandwidthThrottler::new(bandwidth_bytes),
            retry: config.retry,
        })
    }

    fn partial_path(dest: &Path) -> PathBuf {
        let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".part");
        dest.with_file_name(name)
    }

    async fn fetch_async(&self, uri: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FetchError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let partial = Self::partial_path(dest);
        let attempts = AtomicU32::new(0);

        with_retry(&self.retry, || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            self.attempt(uri, dest, &partial, attempt)
        })
        .await
    }

    async fn attempt(&self, uri: &str, dest: &Path, partial: &Path, attempt: u32) -> Result<()> {
        let resume_from = std::fs::metadata(partial).map(|m| m.len()).unwrap_or(0);

        let mut request = self.client.get(uri);
        if resume_from > 0 {
            request = request.header(RANGE, format!("bytes={resume_from}-"));
        }

        debug!(uri, resume_from, attempt, "sending fetch request");
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(uri, attempt, &e))?;

        let status = response.status();
        if status.as_u16() == 416 || (resume_from > 0 && status.as_u16() == 200) {
            warn!(uri, "server did not honor resume, restarting from scratch");
            let _ = std::fs::remove_file(partial);
            return Err(FetchError::Transient {
                uri: uri.to_string(),
                retries: attempt,
                message: "range request unsupported, restarting".into(),
            });
        }
        if !status.is_success() && status.as_u16() != 206 {
            return Err(FetchError::from_status(uri, attempt, status.as_u16()));
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(resume_from > 0)
            .truncate(resume_from == 0)
            .open(partial)
            .map_err(|e| FetchError::Io {
                path: partial.to_path_buf(),
                source: e,
            })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::from_reqwest(uri, attempt, &e))?;
            self.throttle.acquire(chunk.len()).await;
            file.write_all(&chunk).map_err(|e| FetchError::Io {
                path: partial.to_path_buf(),
                source: e,
            })?;
        }
        drop(file);

        std::fs::rename(partial, dest).map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

impl coralpkg_core::Fetcher for HttpFetcher {
    fn fetch(&self, uri: &str, dest: &Path) -> coralpkg_core::Result<()> {
        self.runtime.block_on(self.fetch_async(uri, dest)).map_err(Into::into)
    }
}
