//! Results of a run: per-case [`TestResult`]s and the aggregated [`RunSummary`].
//!
//! Everything here is plain data and serialises to JSON, so external tooling can
//! consume a run without parsing the text report.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::assertion::Violation;
use crate::case::{CaseError, SourceLocation, TestCase};
use crate::group::Tier;

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const FAILURES: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const NO_CASES: i32 = 5;
}

/// Whether a case failed its expectation or broke its premise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    AssertionFailure,
    Error,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::AssertionFailure => "assertion-failure",
            Classification::Error => "error",
        }
    }
}

/// Diagnostic record of one non-passing case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub case_id: String,
    pub classification: Classification,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Every violation, in evaluation order. More than one only in collect mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    /// Where an `error` came from: `returned <type>`, `panic`, `timeout`, `teardown`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Failure {
    pub fn from_case_error(case: &TestCase, error: CaseError) -> Self {
        match error {
            CaseError::Assertion(violations) => {
                let first = violations.first();
                Self {
                    case_id: case.id().to_string(),
                    classification: Classification::AssertionFailure,
                    message: first.map_or_else(|| "assertion violated".to_string(), |v| v.message.clone()),
                    expected: first.map(|v| v.expected.clone()),
                    actual: first.map(|v| v.actual.clone()),
                    location: first.map(|v| v.location.clone()).or_else(|| case.location().cloned()),
                    violations,
                    origin: None,
                }
            }
            CaseError::Unexpected {
                message,
                origin,
                violations,
            } => Self {
                violations,
                ..Self::error(case, message, origin, None)
            },
        }
    }

    pub fn error(
        case: &TestCase,
        message: impl Into<String>,
        origin: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            case_id: case.id().to_string(),
            classification: Classification::Error,
            message: message.into(),
            expected: None,
            actual: None,
            location: location.or_else(|| case.location().cloned()),
            violations: Vec::new(),
            origin: Some(origin.into()),
        }
    }

    pub fn timed_out(case: &TestCase, message: impl Into<String>) -> Self {
        Self::error(case, message, "timeout", None)
    }

    pub fn is_timeout(&self) -> bool {
        self.origin.as_deref() == Some("timeout")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Passed,
    Failed(Failure),
}

impl Outcome {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }

    pub fn classification(&self) -> Option<Classification> {
        self.failure().map(|f| f.classification)
    }
}

/// Outcome of running one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub id: String,
    pub module: String,
    pub tier: Tier,
    /// Registry position; the stable sort key of the final report.
    pub position: usize,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    pub outcome: Outcome,
}

impl TestResult {
    pub fn new(case: &TestCase, position: usize, duration: Duration, outcome: Outcome) -> Self {
        Self {
            id: case.id().to_string(),
            module: case.group().module.clone(),
            tier: case.group().tier,
            position,
            duration,
            outcome,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }
}

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Passed,
    Failed,
    /// Nothing ran. Neither success nor failure.
    NoCases,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Passed => exit::SUCCESS,
            RunStatus::Failed => exit::FAILURES,
            RunStatus::NoCases => exit::NO_CASES,
        }
    }
}

/// Aggregate of one run, ordered by registry position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub results: Vec<TestResult>,
    pub failures: Vec<Failure>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Build a summary; `results` are re-sorted by registry position.
    pub fn new(mut results: Vec<TestResult>, elapsed: Duration) -> Self {
        results.sort_by_key(|r| r.position);
        let failures: Vec<Failure> = results.iter().filter_map(|r| r.outcome.failure().cloned()).collect();
        let errored = failures
            .iter()
            .filter(|f| f.classification == Classification::Error)
            .count();
        let failed = failures.len() - errored;
        let total = results.len();
        let status = if total == 0 {
            RunStatus::NoCases
        } else if failures.is_empty() {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        };
        Self {
            status,
            total,
            passed: total - failures.len(),
            failed,
            errored,
            elapsed,
            results,
            failures,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// `(id, classification)` pairs in registry order; stable across identical runs.
    pub fn classifications(&self) -> Vec<(String, Option<Classification>)> {
        self.results
            .iter()
            .map(|r| (r.id.clone(), r.outcome.classification()))
            .collect()
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
