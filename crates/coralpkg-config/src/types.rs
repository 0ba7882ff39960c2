//! The parsed form of `coralpkg.conf`'s three sections.

use std::path::PathBuf;

/// `[general]`: distribution identity and transaction-wide defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralConfig {
    pub distribution: String,
    pub distribution_release: String,
    pub architecture: String,
    /// Download bandwidth limit in KiB/s; `0` means unlimited.
    pub bandwidth_limit: u32,
    pub retry_attempts: u32,
    pub ignore_safety: bool,
    pub ignore_delta: bool,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub ftp_proxy: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            distribution: "coral".into(),
            distribution_release: "2024".into(),
            architecture: std::env::consts::ARCH.to_string(),
            bandwidth_limit: 0,
            retry_attempts: 5,
            ignore_safety: false,
            ignore_delta: false,
            http_proxy: None,
            https_proxy: None,
            ftp_proxy: None,
        }
    }
}

/// `[build]`: out of core for this implementation, kept as a free-form
/// bag of key/value pairs so a well-formed file with a `[build]` section
/// round-trips without data loss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfig {
    pub raw: Vec<(String, String)>,
}

/// `[directories]`: the on-disk layout roots.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoriesConfig {
    pub lib_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            lib_dir: PathBuf::from("/var/lib/coralpkg"),
            cache_dir: PathBuf::from("/var/cache/coralpkg"),
            log_dir: PathBuf::from("/var/lib/coralpkg/history"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub general: GeneralConfig,
    pub build: BuildConfig,
    pub directories: DirectoriesConfig,
}
