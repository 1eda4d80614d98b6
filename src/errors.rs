//! Verdict Error Handling
//!
//! Only configuration errors live here. They are fatal to a run before any case
//! executes: a bad discovery root, a malformed filter pattern, a duplicate case
//! identifier, an unreadable parameter table or config file. Per-case problems are
//! never errors of this kind; they are recorded as [`crate::outcome::Failure`]s.
//!
//! Every variant carries a stable diagnostic code and a help line so the CLI can
//! render it through `miette`.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result alias for fallible framework operations.
pub type VerdictResult<T> = Result<T, VerdictError>;

/// A configuration error. Aborts the run; no summary is produced.
#[derive(Debug, Error, Diagnostic)]
pub enum VerdictError {
    #[error("discovery root `{root}` does not match any mounted module")]
    #[diagnostic(
        code(verdict::config::root_not_found),
        help("use `.` for the whole catalog or one of: {known}")
    )]
    RootNotFound { root: String, known: String },

    #[error("discovery root `{root}` is malformed: {reason}")]
    #[diagnostic(
        code(verdict::config::malformed_root),
        help("roots are `/`-separated module paths such as `unit/discount`")
    )]
    MalformedRoot { root: String, reason: String },

    #[error("filter pattern `{pattern}` is invalid: {reason}")]
    #[diagnostic(
        code(verdict::config::invalid_pattern),
        help("patterns are substrings or globs using `*`, `?` and `[...]`")
    )]
    InvalidPattern { pattern: String, reason: String },

    #[error("duplicate case identifier `{id}`")]
    #[diagnostic(
        code(verdict::config::duplicate_case),
        help("rename one of the cases or give the parameter rows distinct labels")
    )]
    DuplicateCase { id: String },

    #[error("parameter table `{table}` required by `{template}` was not found")]
    #[diagnostic(
        code(verdict::config::missing_table),
        help("add `{table}.yaml` (or .yml/.json) to the data directory passed with --data")
    )]
    MissingTable { table: String, template: String },

    #[error("failed to load parameter table {}: {message}", path.display())]
    #[diagnostic(code(verdict::config::table_load))]
    TableLoad { path: PathBuf, message: String },

    #[error("data directory {} does not exist or is not a directory", path.display())]
    #[diagnostic(
        code(verdict::config::data_dir_not_found),
        help("pass an existing directory with --data")
    )]
    DataDirNotFound { path: PathBuf },

    #[error("failed to read config file {}: {message}", path.display())]
    #[diagnostic(code(verdict::config::config_file))]
    ConfigFile { path: PathBuf, message: String },

    #[error("invalid setting `{key}`: {reason}")]
    #[diagnostic(code(verdict::config::invalid_setting))]
    InvalidSetting { key: String, reason: String },
}

impl VerdictError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_setting(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn table_load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::TableLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
