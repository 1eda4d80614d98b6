//! Verdict: a small unit-test framework.
//!
//! Test code is organised in [`TestGroup`]s mounted in a [`Catalog`]. The
//! [`Discoverer`] turns the catalog into a [`Registry`] using a naming allow-list,
//! expanding parameterized templates on the way; the [`Runner`] executes each case
//! in isolation; the [`Reporter`] renders the resulting [`RunSummary`].
//!
//! ```
//! use verdict::{assert_eq, Catalog, Discoverer, Runner, TestGroup};
//!
//! let catalog = Catalog::new().mount(
//!     "unit/arith",
//!     TestGroup::new("TestArith")
//!         .case("test_adds", |_, cx| cx.check(assert_eq(4, 2 + 2)))
//!         .build(),
//! );
//! let discovery = Discoverer::new().discover(&catalog, ".").unwrap();
//! let summary = Runner::default().run(&discovery.registry);
//! assert_eq!(summary.passed, 1);
//! ```

pub mod assertion;
pub mod case;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod group;
pub mod outcome;
pub mod params;
pub mod registry;
pub mod report;
pub mod runner;
pub mod tables;

pub use crate::assertion::{
    assert_approx_eq, assert_eq, assert_false, assert_ne, assert_panics, assert_raises, assert_true, Verdict,
    Violation,
};
pub use crate::case::{AssertionMode, CaseBody, CaseContext, CaseError, CaseResult, SourceLocation, TestCase};
pub use crate::catalog::Catalog;
pub use crate::discovery::{CaseFilter, Discoverer, Discovery, NamingConvention};
pub use crate::errors::{VerdictError, VerdictResult};
pub use crate::group::{GroupBuilder, TestGroup, Tier};
pub use crate::outcome::{Classification, Failure, Outcome, RunStatus, RunSummary, TestResult};
pub use crate::params::ParameterSet;
pub use crate::registry::Registry;
pub use crate::report::{ProgressSink, Reporter};
pub use crate::runner::{RunConfig, Runner};
pub use crate::tables::TableStore;
