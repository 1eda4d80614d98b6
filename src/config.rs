//! Run configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional YAML config file, and command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use termcolor::ColorChoice;

use crate::case::AssertionMode;
use crate::errors::{VerdictError, VerdictResult};
use crate::group::Tier;
pub use crate::runner::RunConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolve against the terminal: `auto` only colours an interactive stdout.
    pub fn choice(&self) -> ColorChoice {
        match self {
            ColorMode::Auto if atty::is(atty::Stream::Stdout) => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}

/// Contents of a `--config` file. Every key is optional; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub root: Option<String>,
    pub filter: Option<String>,
    pub tiers: Option<Vec<Tier>>,
    pub jobs: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub format: Option<OutputFormat>,
    pub soft_assertions: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub color: Option<ColorMode>,
    pub durations: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> VerdictResult<Self> {
        let config_error = |message: String| VerdictError::ConfigFile {
            path: path.to_path_buf(),
            message,
        };
        let source = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&source).map_err(|e| config_error(e.to_string()))
    }
}

/// Fully resolved settings of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub root: String,
    pub filter: Option<String>,
    /// Empty selects every tier.
    pub tiers: Vec<Tier>,
    pub jobs: usize,
    pub timeout_ms: Option<u64>,
    pub format: OutputFormat,
    pub soft_assertions: bool,
    pub data_dir: Option<PathBuf>,
    pub color: ColorMode,
    /// Show each case's duration in the text report.
    pub durations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            filter: None,
            tiers: Vec::new(),
            jobs: 1,
            timeout_ms: None,
            format: OutputFormat::Text,
            soft_assertions: false,
            data_dir: None,
            color: ColorMode::Auto,
            durations: false,
        }
    }
}

impl Settings {
    /// Overlay the keys present in `file`.
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(root) = file.root {
            self.root = root;
        }
        if file.filter.is_some() {
            self.filter = file.filter;
        }
        if let Some(tiers) = file.tiers {
            self.tiers = tiers;
        }
        if let Some(jobs) = file.jobs {
            self.jobs = jobs;
        }
        if file.timeout_ms.is_some() {
            self.timeout_ms = file.timeout_ms;
        }
        if let Some(format) = file.format {
            self.format = format;
        }
        if let Some(soft) = file.soft_assertions {
            self.soft_assertions = soft;
        }
        if file.data_dir.is_some() {
            self.data_dir = file.data_dir;
        }
        if let Some(color) = file.color {
            self.color = color;
        }
        if let Some(durations) = file.durations {
            self.durations = durations;
        }
    }

    pub fn validate(&self) -> VerdictResult<()> {
        if self.jobs == 0 {
            return Err(VerdictError::invalid_setting("jobs", "must be at least 1"));
        }
        if self.timeout_ms == Some(0) {
            return Err(VerdictError::invalid_setting(
                "timeout_ms",
                "must be positive; omit it to run without a timeout",
            ));
        }
        Ok(())
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            jobs: self.jobs,
            timeout: self.timeout_ms.map(Duration::from_millis),
            assertion_mode: if self.soft_assertions {
                AssertionMode::Collect
            } else {
                AssertionMode::FailFast
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_overlay_defaults() {
        let file: FileConfig =
            serde_yaml::from_str("jobs: 4\ntiers: [unit]\ntimeout_ms: 250\ndurations: true\n").unwrap();
        let mut settings = Settings::default();
        settings.apply_file(file);
        assert_eq!(settings.jobs, 4);
        assert_eq!(settings.tiers, [Tier::Unit]);
        assert_eq!(settings.root, ".");
        assert!(settings.durations);
        assert_eq!(settings.run_config().timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verdict.yaml");
        fs::write(&path, "jobz: 4\n").unwrap();
        assert!(matches!(FileConfig::load(&path), Err(VerdictError::ConfigFile { .. })));
    }

    #[test]
    fn zero_jobs_and_zero_timeout_are_invalid() {
        let settings = Settings {
            jobs: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(VerdictError::InvalidSetting { ref key, .. }) if key == "jobs"));

        let settings = Settings {
            timeout_ms: Some(0),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
