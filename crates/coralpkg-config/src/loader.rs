//! Hand-rolled INI reader for `coralpkg.conf`: no external INI crate
//! pulled in for a three-section, flat key=value format this small.

use crate::error::{ConfigError, Result};
use crate::types::{BuildConfig, Config, DirectoriesConfig, GeneralConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, PartialEq, Eq)]
enum Section {
    General,
    Build,
    Directories,
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true/false".into(),
        }),
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected an integer".into(),
    })
}

/// Loads `path`, returning the coded defaults for any key left unset.
/// A missing file is not an error: it's treated the same as an empty
/// one, since every field has a default.
pub fn load(path: &Path) -> Result<Config> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(&text, path)
}

fn parse(text: &str, path: &Path) -> Result<Config> {
    let mut config = Config::default();
    let mut section: Option<Section> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.split(';').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section = Some(match name.trim().to_ascii_lowercase().as_str() {
                "general" => Section::General,
                "build" => Section::Build,
                "directories" => Section::Directories,
                other => {
                    return Err(ConfigError::UnknownSection {
                        path: path.to_path_buf(),
                        section: other.to_string(),
                    })
                }
            });
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                text: raw_line.to_string(),
            });
        };
        let key = key.trim();
        let value = value.trim();

        match &section {
            Some(Section::General) => apply_general(&mut config.general, key, value)?,
            Some(Section::Build) => config.build.raw.push((key.to_string(), value.to_string())),
            Some(Section::Directories) => apply_directories(&mut config.directories, key, value),
            None => {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    text: raw_line.to_string(),
                })
            }
        }
    }

    Ok(config)
}

fn apply_general(general: &mut GeneralConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "distribution" => general.distribution = value.to_string(),
        "distribution_release" => general.distribution_release = value.to_string(),
        "architecture" => general.architecture = value.to_string(),
        "bandwidth_limit" => general.bandwidth_limit = parse_u32(key, value)?,
        "retry_attempts" => general.retry_attempts = parse_u32(key, value)?,
        "ignore_safety" => general.ignore_safety = parse_bool(key, value)?,
        "ignore_delta" => general.ignore_delta = parse_bool(key, value)?,
        "http_proxy" => general.http_proxy = Some(value.to_string()),
        "https_proxy" => general.https_proxy = Some(value.to_string()),
        "ftp_proxy" => general.ftp_proxy = Some(value.to_string()),
        other => warn!(key = other, "ignoring unknown [general] key"),
    }
    Ok(())
}

fn apply_directories(directories: &mut DirectoriesConfig, key: &str, value: &str) {
    match key {
        "lib_dir" => directories.lib_dir = PathBuf::from(value),
        "cache_dir" => directories.cache_dir = PathBuf::from(value),
        "log_dir" => directories.log_dir = PathBuf::from(value),
        other => warn!(key = other, "ignoring unknown [directories] key"),
    }
}

/// Serializes `config` back to `coralpkg.conf`'s INI shape.
#[must_use]
pub fn render(config: &Config) -> String {
    let mut out = String::new();
    out.push_str("[general]\n");
    out.push_str(&format!("distribution = {}\n", config.general.distribution));
    out.push_str(&format!(
        "distribution_release = {}\n",
        config.general.distribution_release
    ));
    out.push_str(&format!("architecture = {}\n", config.general.architecture));
    out.push_str(&format!("bandwidth_limit = {}\n", config.general.bandwidth_limit));
    out.push_str(&format!("retry_attempts = {}\n", config.general.retry_attempts));
    out.push_str(&format!("ignore_safety = {}\n", config.general.ignore_safety));
    out.push_str(&format!("ignore_delta = {}\n", config.general.ignore_delta));
    if let Some(p) = &config.general.http_proxy {
        out.push_str(&format!("http_proxy = {p}\n"));
    }
    if let Some(p) = &config.general.https_proxy {
        out.push_str(&format!("https_proxy = {p}\n"));
    }
    if let Some(p) = &config.general.ftp_proxy {
        out.push_str(&format!("ftp_proxy = {p}\n"));
    }

    if !config.build.raw.is_empty() {
        out.push_str("\n[build]\n");
        for (k, v) in &config.build.raw {
            out.push_str(&format!("{k} = {v}\n"));
        }
    }

    out.push_str("\n[directories]\n");
    out.push_str(&format!("lib_dir = {}\n", config.directories.lib_dir.display()));
    out.push_str(&format!("cache_dir = {}\n", config.directories.cache_dir.display()));
    out.push_str(&format!("log_dir = {}\n", config.directories.log_dir.display()));
    out
}

/// Writes `config` to `path`, creating parent directories as needed.
pub fn save(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, render(config)).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Path::new("/no/such/coralpkg.conf")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_all_three_sections() {
        let text = "\
[general]
distribution = coral
distribution_release = 2025
architecture = x86_64
bandwidth_limit = 512
retry_attempts = 3
ignore_safety = true
ignore_delta = false
http_proxy = http://proxy.example:8080

[build]
jobs = 4

[directories]
lib_dir = /srv/coralpkg
cache_dir = /srv/cache
log_dir = /srv/history
";
        let config = parse(text, Path::new("coralpkg.conf")).unwrap();
        assert_eq!(config.general.distribution, "coral");
        assert_eq!(config.general.bandwidth_limit, 512);
        assert!(config.general.ignore_safety);
        assert!(!config.general.ignore_delta);
        assert_eq!(config.general.http_proxy.as_deref(), Some("http://proxy.example:8080"));
        assert_eq!(config.build.raw, vec![("jobs".to_string(), "4".to_string())]);
        assert_eq!(config.directories.lib_dir, PathBuf::from("/srv/coralpkg"));
    }

    #[test]
    fn unknown_section_errors() {
        let err = parse("[nope]\nkey = value\n", Path::new("coralpkg.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection { .. }));
    }

    #[test]
    fn key_outside_any_section_errors() {
        let err = parse("key = value\n", Path::new("coralpkg.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn render_then_reparse_round_trips() {
        let mut config = Config::default();
        config.general.bandwidth_limit = 1024;
        config.build.raw.push(("jobs".to_string(), "8".to_string()));
        let rendered = render(&config);
        let reparsed = parse(&rendered, Path::new("coralpkg.conf")).unwrap();
        assert_eq!(config, reparsed);
    }
}
