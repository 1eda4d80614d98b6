//! Demo test binary: the example suites run through the Verdict CLI.
//!
//! Try `verdict_demo unit`, `verdict_demo --list`, `verdict_demo faults -j 4`
//! or `verdict_demo --format json integration`.

mod subjects;
mod suites;

use std::path::Path;
use std::process::ExitCode;

const TABLES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/tables");

fn main() -> ExitCode {
    let catalog = suites::catalog();
    verdict::cli::run(&catalog, Some(Path::new(TABLES_DIR)))
}
