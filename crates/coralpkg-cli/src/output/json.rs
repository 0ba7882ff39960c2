//! JSON output for machine-readable CLI output (`--json`): errors and
//! command results, suitable for scripting.

use coralpkg_core::Error as CoreError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

static JSON_OUTPUT: AtomicBool = AtomicBool::new(false);

pub fn enable() {
    JSON_OUTPUT.store(true, Ordering::Relaxed);
}

pub fn disable() {
    JSON_OUTPUT.store(false, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    JSON_OUTPUT.load(Ordering::Relaxed)
}

#[derive(Debug, Serialize)]
pub struct JsonError {
    pub code: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

/// The package/path/uri this error is about, when the error variant
/// carries one.
#[derive(Debug, Serialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}

impl JsonError {
    #[must_use]
    pub fn from_core_error(err: &CoreError) -> Self {
        Self {
            code: err.code().as_str().to_string(),
            title: err.code().title().to_string(),
            message: err.to_string(),
            context: extract_context(err),
        }
    }

    #[must_use]
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(core_err) = err.downcast_ref::<CoreError>() {
            return Self::from_core_error(core_err);
        }
        Self {
            code: "E0000".to_string(),
            title: "Unexpected error".to_string(),
            message: err.to_string(),
            context: None,
        }
    }

    pub fn print(&self) {
        if let Ok(json) = sonic_rs::to_string_pretty(self) {
            eprintln!("{json}");
        }
    }
}

impl<T: Serialize> JsonResult<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(err: &anyhow::Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(JsonError::from_anyhow(err)),
        }
    }

    pub fn print(&self) {
        if let Ok(json) = sonic_rs::to_string_pretty(self) {
            if self.success {
                println!("{json}");
            } else {
                eprintln!("{json}");
            }
        }
    }
}

fn extract_context(err: &CoreError) -> Option<ErrorContext> {
    let empty = || ErrorContext {
        package: None,
        repo: None,
        path: None,
        uri: None,
    };
    match err {
        CoreError::UnknownPackage { name, .. } => Some(ErrorContext {
            package: Some(name.clone()),
            ..empty()
        }),
        CoreError::UnsatisfiedDependency { package, .. } => Some(ErrorContext {
            package: Some(package.clone()),
            ..empty()
        }),
        CoreError::UnknownRepo { name, .. } | CoreError::IncompatibleDistribution { repo: name, .. } => {
            Some(ErrorContext {
                repo: Some(name.clone()),
                ..empty()
            })
        }
        CoreError::IndexCorrupt { repo, .. } | CoreError::RepoUnreachable { repo, .. } => Some(ErrorContext {
            repo: Some(repo.clone()),
            ..empty()
        }),
        CoreError::HashMismatch { path, .. }
        | CoreError::ArchiveCorrupt { path, .. }
        | CoreError::FileConflict { path, .. }
        | CoreError::PermissionDenied { path, .. }
        | CoreError::StagingFailed { path, .. }
        | CoreError::SignatureInvalid { path, .. }
        | CoreError::Io { path, .. } => Some(ErrorContext {
            path: Some(path.display().to_string()),
            ..empty()
        }),
        CoreError::Fetch { uri, .. } => Some(ErrorContext {
            uri: Some(uri.clone()),
            ..empty()
        }),
        _ => None,
    }
}

/// Print an error as JSON if `--json` is active, otherwise as a plain
/// coded line on stderr.
pub fn print_error(err: &anyhow::Error) {
    if is_enabled() {
        JsonError::from_anyhow(err).print();
    } else {
        super::error(&err.to_string());
    }
}

/// Report a command's result: prints a JSON envelope in `--json` mode,
/// otherwise leaves human-readable reporting to the caller. Always
/// forwards the original `Result`.
pub fn handle_result<T: Serialize>(result: Result<T, anyhow::Error>) -> Result<T, anyhow::Error> {
    match result {
        Ok(data) => {
            if is_enabled() {
                JsonResult::success(&data).print();
            }
            Ok(data)
        }
        Err(e) => {
            print_error(&e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_from_core_carries_code_and_context() {
        let err = CoreError::unknown_package("nonexistent");
        let json_err = JsonError::from_core_error(&err);
        assert_eq!(json_err.code, "E0101");
        assert_eq!(json_err.title, "Unknown package");
        assert!(json_err.message.contains("nonexistent"));
        assert_eq!(json_err.context.unwrap().package.as_deref(), Some("nonexistent"));
    }

    #[test]
    fn json_result_success_roundtrips() {
        #[derive(Serialize)]
        struct TestData {
            count: usize,
        }
        let result: JsonResult<TestData> = JsonResult::success(TestData { count: 42 });
        assert!(result.success);
        assert!(result.data.is_some());
        assert!(result.error.is_none());
    }

    #[test]
    fn json_mode_toggle() {
        disable();
        assert!(!is_enabled());
        enable();
        assert!(is_enabled());
        disable();
        assert!(!is_enabled());
    }
}
