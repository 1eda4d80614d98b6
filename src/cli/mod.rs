//! The Verdict command-line interface.
//!
//! A test binary builds its [`Catalog`] and hands it to [`run`], which parses the
//! flags, resolves settings, discovers, runs and reports. Configuration errors are
//! printed as diagnostics and end the process with the configuration exit code
//! before any case executes.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use termcolor::StandardStream;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::{FileConfig, OutputFormat, Settings};
use crate::discovery::{CaseFilter, Discoverer};
use crate::errors::VerdictResult;
use crate::outcome::exit;
use crate::report::{NoProgress, ProgressLine, Reporter};
use crate::runner::Runner;
use crate::tables::TableStore;

pub mod args;
pub mod output;

use args::VerdictArgs;

/// Entry point for a test binary.
///
/// `default_data_dir` is used for parameter tables when neither `--data` nor the
/// config file names a directory; it is skipped silently if it does not exist.
pub fn run(catalog: &Catalog, default_data_dir: Option<&Path>) -> ExitCode {
    output::init_logging();
    let args = VerdictArgs::parse();
    let code = execute(catalog, &args, default_data_dir);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Run with already parsed arguments and return the process exit code.
pub fn execute(catalog: &Catalog, args: &VerdictArgs, default_data_dir: Option<&Path>) -> i32 {
    match try_execute(catalog, args, default_data_dir) {
        Ok(code) => code,
        Err(err) => {
            output::print_config_error(err);
            exit::CONFIGURATION
        }
    }
}

fn try_execute(catalog: &Catalog, args: &VerdictArgs, default_data_dir: Option<&Path>) -> VerdictResult<i32> {
    let settings = resolve_settings(args)?;

    let tables = match (&settings.data_dir, default_data_dir) {
        (Some(dir), _) => TableStore::load_dir(dir)?,
        (None, Some(dir)) if dir.is_dir() => TableStore::load_dir(dir)?,
        _ => TableStore::empty(),
    };
    let filter = settings.filter.as_deref().map(CaseFilter::parse).transpose()?;
    let discovery = Discoverer::new()
        .with_filter(filter)
        .with_tiers(settings.tiers.clone())
        .with_tables(tables)
        .discover(catalog, &settings.root)?;

    let mut stdout = StandardStream::stdout(settings.color.choice());
    if args.list {
        for id in discovery.registry.ids() {
            // A closed pipe (`| head`) simply ends the listing.
            if writeln!(stdout, "{id}").is_err() {
                break;
            }
        }
        return Ok(exit::SUCCESS);
    }

    info!(root = %settings.root, cases = discovery.registry.len(), "discovered");
    let runner = Runner::new(settings.run_config());
    let summary = match settings.format {
        OutputFormat::Text => {
            let mut progress = ProgressLine::new(StandardStream::stdout(settings.color.choice()));
            runner.run_with(&discovery.registry, &mut progress)
        }
        OutputFormat::Json => runner.run_with(&discovery.registry, &mut NoProgress),
    }
    .with_warnings(discovery.warnings);

    let reporter = Reporter::new().with_durations(settings.durations);
    let written = match settings.format {
        OutputFormat::Text => writeln!(stdout).and_then(|_| reporter.render(&summary, &mut stdout)),
        OutputFormat::Json => reporter.render_json(&summary, &mut stdout),
    };
    if let Err(err) = written {
        error!("failed to write the report: {err}");
    }
    Ok(summary.exit_code())
}

fn resolve_settings(args: &VerdictArgs) -> VerdictResult<Settings> {
    let mut settings = Settings::default();
    if let Some(path) = &args.config {
        settings.apply_file(FileConfig::load(path)?);
    }
    args.apply_to(&mut settings);
    settings.validate()?;
    Ok(settings)
}
