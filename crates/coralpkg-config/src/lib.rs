//! `coralpkg.conf`: the INI configuration file under `/etc/coralpkg`,
//! plus the proxy environment overrides layered on top of it.

pub mod env;
pub mod error;
pub mod loader;
pub mod types;

pub use env::apply_env_overrides;
pub use error::{ConfigError, Result};
pub use loader::{load, render, save};
pub use types::{BuildConfig, Config, DirectoriesConfig, GeneralConfig};

use std::path::Path;

/// Loads `path`, then applies the proxy environment overrides. This is
/// the entry point `coralpkg-cli` calls; `load`/`apply_env_overrides`
/// stay separately usable for tests that want the file contents alone.
pub fn load_with_env(path: &Path) -> Result<Config> {
    let mut config = load(path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_env_applies_overrides_over_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coralpkg.conf");
        std::fs::write(&path, "[general]\nhttp_proxy = http://from-file\n").unwrap();

        std::env::set_var("HTTP_PROXY", "http://from-env");
        let config = load_with_env(&path).unwrap();
        std::env::remove_var("HTTP_PROXY");

        assert_eq!(config.general.http_proxy.as_deref(), Some("http://from-env"));
    }
}
