//! Environment overrides applied on top of a loaded [`Config`].
//!
//! Only the proxy variables spec.md calls out: `HTTP_PROXY`,
//! `HTTPS_PROXY`, `FTP_PROXY` take precedence over whatever the config
//! file set, when present.

use crate::types::Config;

/// Applies `HTTP_PROXY`/`HTTPS_PROXY`/`FTP_PROXY` from the process
/// environment over `config`'s proxy fields, in place.
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("HTTP_PROXY") {
        config.general.http_proxy = Some(v);
    }
    if let Ok(v) = std::env::var("HTTPS_PROXY") {
        config.general.https_proxy = Some(v);
    }
    if let Ok(v) = std::env::var("FTP_PROXY") {
        config.general.ftp_proxy = Some(v);
    }
}
