//! Command-line arguments of a Verdict test binary.
//!
//! Every flag is optional so that a config file (or the defaults) can supply the
//! value; a flag that is given always wins.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ColorMode, OutputFormat, Settings};
use crate::group::Tier;

#[derive(Debug, Parser)]
#[command(version, about = "Discover, run and report the test cases of this binary.")]
pub struct VerdictArgs {
    /// Discovery root: a `/`-separated module path, or `.` for everything.
    pub root: Option<String>,

    /// Only run cases whose id or module matches (substring or glob).
    #[arg(short, long, value_name = "PATTERN")]
    pub filter: Option<String>,

    /// Only run cases of this tier. Repeatable.
    #[arg(short, long = "tier", value_enum, value_name = "TIER")]
    pub tiers: Vec<Tier>,

    /// Number of cases to run concurrently.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Abort cases still running after this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Record every violated assertion instead of stopping at the first.
    #[arg(long)]
    pub soft: bool,

    #[arg(long, value_enum)]
    pub color: Option<ColorMode>,

    /// Directory of YAML/JSON parameter tables.
    #[arg(long = "data", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// YAML file with default settings.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show how long each case took.
    #[arg(long)]
    pub durations: bool,

    /// Print the discovered case ids and exit without running them.
    #[arg(long)]
    pub list: bool,
}

impl VerdictArgs {
    /// Overlay the flags that were given.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(root) = &self.root {
            settings.root = root.clone();
        }
        if self.filter.is_some() {
            settings.filter = self.filter.clone();
        }
        if !self.tiers.is_empty() {
            settings.tiers = self.tiers.clone();
        }
        if let Some(jobs) = self.jobs {
            settings.jobs = jobs;
        }
        if self.timeout_ms.is_some() {
            settings.timeout_ms = self.timeout_ms;
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if self.soft {
            settings.soft_assertions = true;
        }
        if let Some(color) = self.color {
            settings.color = color;
        }
        if self.data_dir.is_some() {
            settings.data_dir = self.data_dir.clone();
        }
        if self.durations {
            settings.durations = true;
        }
    }
}
