//! Reporter: live progress while a run executes, then the final report.
//!
//! Progress is emitted in completion order and may interleave differently between
//! parallel runs. The final report is rendered from a [`RunSummary`], which is
//! already in registry order, so it reads the same regardless of scheduling.

use std::io::{self, Write};

use termcolor::{Color, ColorSpec, NoColor, WriteColor};

use crate::outcome::{Classification, Failure, Outcome, RunStatus, RunSummary, TestResult};

// ============================================================================
// LIVE PROGRESS
// ============================================================================

/// Receives results while a run is in progress.
pub trait ProgressSink {
    fn on_run_start(&mut self, _total: usize) {}

    /// Called once per case, in completion order.
    fn on_case_finished(&mut self, result: &TestResult);

    fn on_run_finished(&mut self, _summary: &RunSummary) {}
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_case_finished(&mut self, _result: &TestResult) {}
}

/// One character per finished case: `.` passed, `F` failed, `E` errored.
pub struct ProgressLine<W: WriteColor> {
    out: W,
    width: usize,
    column: usize,
}

impl<W: WriteColor> ProgressLine<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: 72,
            column: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: WriteColor> ProgressSink for ProgressLine<W> {
    fn on_case_finished(&mut self, result: &TestResult) {
        let (mark, color) = match result.outcome.classification() {
            None => ('.', Color::Green),
            Some(Classification::AssertionFailure) => ('F', Color::Red),
            Some(Classification::Error) => ('E', Color::Yellow),
        };
        // Progress is best effort; a broken pipe must not fail the run.
        let _ = self.out.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = write!(self.out, "{mark}");
        let _ = self.out.reset();
        self.column += 1;
        if self.column == self.width {
            let _ = writeln!(self.out);
            self.column = 0;
        }
        let _ = self.out.flush();
    }

    fn on_run_finished(&mut self, _summary: &RunSummary) {
        if self.column > 0 {
            let _ = writeln!(self.out);
            self.column = 0;
        }
        let _ = self.out.flush();
    }
}

// ============================================================================
// FINAL REPORT
// ============================================================================

/// Renders a finished run as text or JSON.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    /// Include per-case durations in the status lines.
    pub show_durations: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_durations(mut self, show: bool) -> Self {
        self.show_durations = show;
        self
    }

    pub fn render(&self, summary: &RunSummary, out: &mut impl WriteColor) -> io::Result<()> {
        for result in &summary.results {
            self.status_line(result, out)?;
        }

        if !summary.failures.is_empty() {
            writeln!(out)?;
            writeln!(out, "failures:")?;
            for failure in &summary.failures {
                writeln!(out)?;
                failure_block(failure, out)?;
            }
        }

        if !summary.warnings.is_empty() {
            writeln!(out)?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(out, "warnings:")?;
            out.reset()?;
            for warning in &summary.warnings {
                writeln!(out, "  - {warning}")?;
            }
        }

        writeln!(out)?;
        writeln!(
            out,
            "{} cases: {} passed, {} failed, {} errored in {:.2}s",
            summary.total,
            summary.passed,
            summary.failed,
            summary.errored,
            summary.elapsed.as_secs_f64()
        )?;
        let (verdict, color) = match summary.status() {
            RunStatus::Passed => ("PASSED", Color::Green),
            RunStatus::Failed => ("FAILED", Color::Red),
            RunStatus::NoCases => ("NO CASES", Color::Yellow),
        };
        write!(out, "result: ")?;
        out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(out, "{verdict}")?;
        out.reset()?;
        writeln!(out)
    }

    /// Render without colour, for tests and logs.
    pub fn render_to_string(&self, summary: &RunSummary) -> String {
        let mut out = NoColor::new(Vec::new());
        // Writing into a Vec cannot fail.
        let _ = self.render(summary, &mut out);
        String::from_utf8_lossy(&out.into_inner()).into_owned()
    }

    pub fn render_json(&self, summary: &RunSummary, out: &mut impl Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, summary)?;
        writeln!(out)
    }

    fn status_line(&self, result: &TestResult, out: &mut impl WriteColor) -> io::Result<()> {
        let (label, color) = match &result.outcome {
            Outcome::Passed => ("ok", Color::Green),
            Outcome::Failed(failure) => match failure.classification {
                Classification::AssertionFailure => ("FAILED", Color::Red),
                Classification::Error if failure.is_timeout() => ("TIMEOUT", Color::Yellow),
                Classification::Error => ("ERROR", Color::Yellow),
            },
        };
        write!(out, "{} ... ", result.id)?;
        out.set_color(ColorSpec::new().set_fg(Some(color)))?;
        write!(out, "{label}")?;
        out.reset()?;
        if self.show_durations {
            write!(out, " ({:.1}ms)", result.duration.as_secs_f64() * 1000.0)?;
        }
        writeln!(out)
    }
}

fn failure_block(failure: &Failure, out: &mut impl WriteColor) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "---- {} ", failure.case_id)?;
    out.reset()?;
    writeln!(out, "[{}]", failure.classification.as_str())?;
    if let Some(location) = &failure.location {
        writeln!(out, "  at {location}")?;
    }
    writeln!(out, "  {}", failure.message)?;
    if let (Some(expected), Some(actual)) = (&failure.expected, &failure.actual) {
        writeln!(out, "  expected: {expected}")?;
        writeln!(out, "  actual:   {actual}")?;
    }
    if let Some(diff) = failure.violations.first().and_then(|v| v.diff.as_deref()) {
        writeln!(out, "  diff:")?;
        write_diff(diff, out)?;
    }
    let recorded_before_error =
        failure.classification == Classification::Error && !failure.violations.is_empty();
    if failure.violations.len() > 1 || recorded_before_error {
        writeln!(out, "  all violations ({}):", failure.violations.len())?;
        for (i, violation) in failure.violations.iter().enumerate() {
            writeln!(out, "    {}. {violation}", i + 1)?;
        }
    }
    if let Some(origin) = &failure.origin {
        writeln!(out, "  origin: {origin}")?;
    }
    Ok(())
}

fn write_diff(diff: &str, out: &mut impl WriteColor) -> io::Result<()> {
    for line in diff.lines() {
        let color = match line.chars().next() {
            Some('+') => Some(Color::Green),
            Some('-') => Some(Color::Red),
            _ => None,
        };
        out.set_color(ColorSpec::new().set_fg(color))?;
        write!(out, "    {line}")?;
        out.reset()?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::assert_eq;
    use crate::case::{CaseBody, CaseContext, CaseError, CaseResult, TestCase};
    use crate::group::{GroupInfo, Tier};
    use std::sync::Arc;
    use std::time::Duration;

    fn case(name: &str) -> TestCase {
        let info = Arc::new(GroupInfo {
            name: "TestReport".to_string(),
            module: "unit/report".to_string(),
            tier: Tier::Unit,
            assertion_mode: None,
            timeout: None,
        });
        let body: Arc<dyn CaseBody> = Arc::new(|_: &mut CaseContext| -> CaseResult { Ok(()) });
        TestCase::new(info, name, body)
    }

    fn summary() -> RunSummary {
        let pass = case("test_pass");
        let fail = case("test_fail");
        let violation = assert_eq(2, 3).into_result().unwrap_err();
        let failure = Failure::from_case_error(&fail, CaseError::from(violation));
        RunSummary::new(
            vec![
                TestResult::new(&fail, 1, Duration::from_millis(2), Outcome::Failed(failure)),
                TestResult::new(&pass, 0, Duration::from_millis(1), Outcome::Passed),
            ],
            Duration::from_millis(50),
        )
    }

    #[test]
    fn text_report_lists_cases_in_registry_order() {
        let text = Reporter::new().render_to_string(&summary());
        let pass = text.find("TestReport::test_pass ... ok").unwrap();
        let fail = text.find("TestReport::test_fail ... FAILED").unwrap();
        assert!(pass < fail);
        assert!(text.contains("  expected: 2\n  actual:   3\n"));
        assert!(text.contains("2 cases: 1 passed, 1 failed, 0 errored in 0.05s"));
        assert!(text.ends_with("result: FAILED\n"));
    }

    #[test]
    fn durations_are_opt_in() {
        let plain = Reporter::new().render_to_string(&summary());
        assert!(plain.contains("TestReport::test_pass ... ok\n"));

        let timed = Reporter::new().with_durations(true).render_to_string(&summary());
        assert!(timed.contains("TestReport::test_pass ... ok (1.0ms)\n"));
        assert!(timed.contains("TestReport::test_fail ... FAILED (2.0ms)\n"));
    }

    #[test]
    fn errors_list_violations_recorded_before_them() {
        let crashed = case("test_crash");
        let violation = assert_eq(2, 3).into_result().unwrap_err();
        let error = CaseError::Unexpected {
            message: "ledger offline".to_string(),
            origin: "case body".to_string(),
            violations: vec![violation],
        };
        let failure = Failure::from_case_error(&crashed, error);
        assert_eq!(failure.classification, Classification::Error);
        let summary = RunSummary::new(
            vec![TestResult::new(&crashed, 0, Duration::from_millis(1), Outcome::Failed(failure))],
            Duration::from_millis(50),
        );
        let text = Reporter::new().render_to_string(&summary);
        assert!(text.contains("---- TestReport::test_crash [error]\n"));
        assert!(text.contains("  ledger offline\n"));
        assert!(text.contains("  all violations (1):\n    1. values differ: expected 2, actual 3"));
        assert!(text.contains("  origin: case body\n"));
    }

    #[test]
    fn progress_marks_each_outcome() {
        let mut line = ProgressLine::new(NoColor::new(Vec::new()));
        let summary = summary();
        for result in &summary.results {
            line.on_case_finished(result);
        }
        line.on_run_finished(&summary);
        assert_eq!(line.into_inner().into_inner(), b".F\n");
    }

    #[test]
    fn json_report_is_structured() {
        let mut out = Vec::new();
        Reporter::new().render_json(&summary(), &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failures"][0]["classification"], "assertion-failure");
        assert_eq!(json["failures"][0]["expected"], "2");
        assert_eq!(json["results"][0]["outcome"]["status"], "passed");
    }
}
