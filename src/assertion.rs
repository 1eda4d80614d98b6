//! Assertion Engine
//!
//! Each evaluator checks one expectation and returns a [`Verdict`] instead of
//! unwinding. A violated verdict carries a [`Violation`] whose message always names
//! both the expected and the actual value (or condition, or failure kind).
//!
//! Evaluators are `#[track_caller]`, so the violation points at the line in the
//! test that made the check.

use std::fmt::{self, Debug, Display};
use std::panic::{self, AssertUnwindSafe};

use difference::{Changeset, Difference};
use serde::Serialize;

use crate::case::SourceLocation;

/// Which evaluator produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Evaluator {
    Equality,
    Inequality,
    ApproxEquality,
    True,
    False,
    Raises,
    Panics,
}

/// A violated expectation with its diagnostic payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub evaluator: Evaluator,
    pub message: String,
    pub expected: String,
    pub actual: String,
    /// Line diff of the pretty-printed values, when they span several lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub location: SourceLocation,
}

impl Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.location)
    }
}

/// Outcome of one evaluator.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a verdict does nothing unless it is checked"]
pub enum Verdict {
    Satisfied,
    Violated(Violation),
}

impl Verdict {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied)
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Satisfied => None,
            Verdict::Violated(violation) => Some(violation),
        }
    }

    pub fn into_result(self) -> Result<(), Violation> {
        match self {
            Verdict::Satisfied => Ok(()),
            Verdict::Violated(violation) => Err(violation),
        }
    }

    /// Prefix the violation message with what was being checked.
    pub fn context(self, what: impl Display) -> Self {
        match self {
            Verdict::Satisfied => Verdict::Satisfied,
            Verdict::Violated(mut violation) => {
                violation.message = format!("{what}: {}", violation.message);
                Verdict::Violated(violation)
            }
        }
    }
}

fn violated(
    evaluator: Evaluator,
    message: String,
    expected: String,
    actual: String,
    location: SourceLocation,
) -> Verdict {
    Verdict::Violated(Violation {
        evaluator,
        message,
        expected,
        actual,
        diff: None,
        location,
    })
}

// ============================================================================
// EQUALITY
// ============================================================================

/// Exact equality under the type's `PartialEq`. No numeric tolerance is applied.
#[track_caller]
pub fn assert_eq<E, A>(expected: E, actual: A) -> Verdict
where
    E: Debug,
    A: Debug + PartialEq<E>,
{
    let location = SourceLocation::caller();
    if actual == expected {
        return Verdict::Satisfied;
    }
    let (exp, act) = (format!("{expected:?}"), format!("{actual:?}"));
    let message = format!("values differ: expected {exp}, actual {act}");
    let mut verdict = violated(Evaluator::Equality, message, exp, act, location);
    if let Verdict::Violated(ref mut violation) = verdict {
        violation.diff = pretty_diff(&expected, &actual);
    }
    verdict
}

#[track_caller]
pub fn assert_ne<E, A>(unexpected: E, actual: A) -> Verdict
where
    E: Debug,
    A: Debug + PartialEq<E>,
{
    let location = SourceLocation::caller();
    if actual != unexpected {
        return Verdict::Satisfied;
    }
    let (exp, act) = (format!("{unexpected:?}"), format!("{actual:?}"));
    violated(
        Evaluator::Inequality,
        format!("values are equal: expected anything but {exp}, actual {act}"),
        format!("not {exp}"),
        act,
        location,
    )
}

/// Equality within an explicit absolute tolerance.
#[track_caller]
pub fn assert_approx_eq(expected: f64, actual: f64, tolerance: f64) -> Verdict {
    let location = SourceLocation::caller();
    let (exp, act) = (format!("{expected:?} ± {tolerance:?}"), format!("{actual:?}"));
    if !tolerance.is_finite() || tolerance < 0.0 {
        return violated(
            Evaluator::ApproxEquality,
            format!(
                "tolerance must be finite and non-negative, got {tolerance:?} (expected {exp}, actual {act})"
            ),
            exp,
            act,
            location,
        );
    }
    // Equal infinities differ by NaN, so compare them directly first.
    if actual == expected || (actual - expected).abs() <= tolerance {
        return Verdict::Satisfied;
    }
    violated(
        Evaluator::ApproxEquality,
        format!("values differ by more than {tolerance:?}: expected {exp}, actual {act}"),
        exp,
        act,
        location,
    )
}

// ============================================================================
// TRUTHINESS
// ============================================================================

#[track_caller]
pub fn assert_true(actual: bool) -> Verdict {
    let location = SourceLocation::caller();
    if actual {
        return Verdict::Satisfied;
    }
    violated(
        Evaluator::True,
        "condition failed: expected true, actual false".to_string(),
        "true".to_string(),
        "false".to_string(),
        location,
    )
}

#[track_caller]
pub fn assert_false(actual: bool) -> Verdict {
    let location = SourceLocation::caller();
    if !actual {
        return Verdict::Satisfied;
    }
    violated(
        Evaluator::False,
        "condition failed: expected false, actual true".to_string(),
        "false".to_string(),
        "true".to_string(),
        location,
    )
}

// ============================================================================
// EXPECTED FAILURE
// ============================================================================

/// Satisfied iff `op` returns an error for which `is_kind` holds.
///
/// `kind` names the expected failure kind in diagnostics. The [`assert_raises!`]
/// macro fills it in from a pattern.
///
/// [`assert_raises!`]: crate::assert_raises
#[track_caller]
pub fn assert_raises<T, E>(
    kind: &str,
    op: impl FnOnce() -> Result<T, E>,
    is_kind: impl FnOnce(&E) -> bool,
) -> Verdict
where
    T: Debug,
    E: Debug,
{
    let location = SourceLocation::caller();
    let expected = format!("error matching {kind}");
    match op() {
        Err(err) if is_kind(&err) => Verdict::Satisfied,
        Err(err) => violated(
            Evaluator::Raises,
            format!("wrong failure kind: expected {expected}, actual error {err:?}"),
            expected,
            format!("Err({err:?})"),
            location,
        ),
        Ok(value) => violated(
            Evaluator::Raises,
            format!("no failure raised: expected {expected}, actual Ok({value:?})"),
            expected,
            format!("Ok({value:?})"),
            location,
        ),
    }
}

/// Satisfied iff `op` panics.
#[track_caller]
pub fn assert_panics<T: Debug>(op: impl FnOnce() -> T) -> Verdict {
    let location = SourceLocation::caller();
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Err(_) => Verdict::Satisfied,
        Ok(value) => violated(
            Evaluator::Panics,
            format!("no panic: expected the operation to panic, actual returned {value:?}"),
            "panic".to_string(),
            format!("returned {value:?}"),
            location,
        ),
    }
}

/// Expected-failure check against an error pattern.
///
/// ```
/// use verdict::assert_raises;
///
/// #[derive(Debug)]
/// enum TransferError {
///     InsufficientFunds { missing: u64 },
/// }
///
/// fn withdraw(balance: u64, amount: u64) -> Result<u64, TransferError> {
///     balance
///         .checked_sub(amount)
///         .ok_or(TransferError::InsufficientFunds { missing: amount - balance })
/// }
///
/// let verdict = assert_raises!(withdraw(10, 25), TransferError::InsufficientFunds { .. });
/// assert!(verdict.is_satisfied());
/// ```
#[macro_export]
macro_rules! assert_raises {
    ($op:expr, $kind:pat $(if $guard:expr)? $(,)?) => {
        $crate::assertion::assert_raises(
            stringify!($kind),
            || $op,
            |err| matches!(err, $kind $(if $guard)?),
        )
    };
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn pretty_diff<E: Debug, A: Debug>(expected: &E, actual: &A) -> Option<String> {
    let (exp, act) = (format!("{expected:#?}"), format!("{actual:#?}"));
    if !exp.contains('\n') && !act.contains('\n') {
        return None;
    }
    let changeset = Changeset::new(&exp, &act, "\n");
    let mut out = String::new();
    for diff in &changeset.diffs {
        let (prefix, text) = match diff {
            Difference::Same(x) => (' ', x),
            Difference::Rem(x) => ('-', x),
            Difference::Add(x) => ('+', x),
        };
        for line in text.lines() {
            out.push(prefix);
            out.push_str(line);
            out.push('\n');
        }
    }
    Some(out)
}
