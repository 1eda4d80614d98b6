//! Test cases and the execution contract between the framework and a case body.
//!
//! A case body is anything implementing [`CaseBody`]: it receives a fresh
//! [`CaseContext`] and returns a [`CaseResult`]. Assertion evaluators never unwind;
//! they produce a [`Verdict`] that the body hands to [`CaseContext::check`], which
//! decides whether the body aborts (fail-fast) or keeps going (collect mode).

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assertion::{Verdict, Violation};
use crate::group::GroupInfo;

// ============================================================================
// SOURCE LOCATIONS
// ============================================================================

/// A `file:line` position in the source of a test suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The location of the caller, propagated through `#[track_caller]` frames.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ============================================================================
// CASE RESULTS
// ============================================================================

/// How a body reacts to a violated assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionMode {
    /// The first violation aborts the body.
    #[default]
    FailFast,
    /// Violations are recorded and the body runs to completion ("soft" assertions).
    Collect,
}

/// Why a case body stopped early.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseError {
    /// One or more assertions were violated. Never empty.
    Assertion(Vec<Violation>),
    /// The body signalled something other than a violated expectation.
    /// `violations` holds what collect mode recorded before that happened.
    Unexpected {
        message: String,
        origin: String,
        violations: Vec<Violation>,
    },
}

pub type CaseResult = Result<(), CaseError>;

impl CaseError {
    /// Signal an unexpected failure from inside a body.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            origin: "case body".to_string(),
            violations: Vec::new(),
        }
    }
}

impl From<Violation> for CaseError {
    fn from(violation: Violation) -> Self {
        Self::Assertion(vec![violation])
    }
}

impl<E> From<E> for CaseError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Unexpected {
            message: err.to_string(),
            origin: format!("returned {}", std::any::type_name::<E>()),
            violations: Vec::new(),
        }
    }
}

impl fmt::Display for CaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseError::Assertion(violations) => match violations.first() {
                Some(first) => write!(f, "{}", first.message),
                None => write!(f, "assertion violated"),
            },
            CaseError::Unexpected { message, .. } => write!(f, "{message}"),
        }
    }
}

// ============================================================================
// CASE CONTEXT
// ============================================================================

/// Per-case state handed to a body. Created fresh for every case.
#[derive(Debug)]
pub struct CaseContext {
    id: String,
    mode: AssertionMode,
    collected: Vec<Violation>,
}

impl CaseContext {
    pub fn new(id: impl Into<String>, mode: AssertionMode) -> Self {
        Self {
            id: id.into(),
            mode,
            collected: Vec::new(),
        }
    }

    /// Identifier of the case being executed.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> AssertionMode {
        self.mode
    }

    /// Feed a verdict into the case.
    ///
    /// In fail-fast mode a violation comes back as `Err`, so `cx.check(..)?` aborts
    /// the body. In collect mode the violation is recorded and `Ok` is returned.
    pub fn check(&mut self, verdict: Verdict) -> CaseResult {
        let Verdict::Violated(violation) = verdict else {
            return Ok(());
        };
        match self.mode {
            AssertionMode::FailFast => Err(CaseError::from(violation)),
            AssertionMode::Collect => {
                self.collected.push(violation);
                Ok(())
            }
        }
    }

    /// Violations recorded so far in collect mode.
    pub fn collected(&self) -> &[Violation] {
        &self.collected
    }

    /// Merge the body's own result with anything recorded in collect mode.
    pub fn finish(self, result: CaseResult) -> CaseResult {
        let mut collected = self.collected;
        match result {
            Ok(()) if collected.is_empty() => Ok(()),
            Ok(()) => Err(CaseError::Assertion(collected)),
            Err(CaseError::Assertion(violations)) => {
                collected.extend(violations);
                Err(CaseError::Assertion(collected))
            }
            Err(CaseError::Unexpected {
                message,
                origin,
                mut violations,
            }) => {
                collected.append(&mut violations);
                Err(CaseError::Unexpected {
                    message,
                    origin,
                    violations: collected,
                })
            }
        }
    }
}

// ============================================================================
// CASE CAPABILITY
// ============================================================================

/// The capability every test case implements: run once against a fresh context.
pub trait CaseBody: Send + Sync {
    fn invoke(&self, cx: &mut CaseContext) -> CaseResult;
}

impl<F> CaseBody for F
where
    F: Fn(&mut CaseContext) -> CaseResult + Send + Sync,
{
    fn invoke(&self, cx: &mut CaseContext) -> CaseResult {
        self(cx)
    }
}

/// A registered, named, zero-argument unit of verification.
///
/// Immutable once built; the registry hands out shared references only.
#[derive(Clone)]
pub struct TestCase {
    id: String,
    name: String,
    group: Arc<GroupInfo>,
    location: Option<SourceLocation>,
    body: Arc<dyn CaseBody>,
}

impl TestCase {
    /// Build a case whose identifier is `<group>::<name>`.
    pub fn new(group: Arc<GroupInfo>, name: impl Into<String>, body: Arc<dyn CaseBody>) -> Self {
        let name = name.into();
        Self {
            id: format!("{}::{}", group.name, name),
            name,
            group,
            location: None,
            body,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &GroupInfo {
        &self.group
    }

    /// Module path followed by the identifier, e.g. `unit/discount::TestDiscount::test_x`.
    pub fn qualified_id(&self) -> String {
        if self.group.module.is_empty() {
            self.id.clone()
        } else {
            format!("{}::{}", self.group.module, self.id)
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn body(&self) -> &Arc<dyn CaseBody> {
        &self.body
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("module", &self.group.module)
            .field("tier", &self.group.tier)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
