//! Runner: executes every registered case exactly once and collects the results.
//!
//! With `jobs = 1` cases run one after another in registry order. With more jobs,
//! cases are spread over a rayon pool of that many threads and complete in any
//! order. Either way the summary is sorted back into registry order before anyone
//! sees it.

mod isolation;

use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, trace, warn};

use crate::case::{AssertionMode, TestCase};
use crate::outcome::{Failure, Outcome, RunSummary, TestResult};
use crate::registry::Registry;
use crate::report::{NoProgress, ProgressSink};

pub(crate) use isolation::{panic_message, preserving_panic_location};

/// Knobs of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Size of the worker pool. `1` means sequential execution.
    pub jobs: usize,
    /// Wall-clock limit for the whole run.
    pub timeout: Option<Duration>,
    /// Used for groups that do not pin their own mode.
    pub assertion_mode: AssertionMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            timeout: None,
            assertion_mode: AssertionMode::FailFast,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(&self, registry: &Registry) -> RunSummary {
        self.run_with(registry, &mut NoProgress)
    }

    /// Run every case, reporting each result to `progress` as it completes.
    ///
    /// Never aborts early: failures, panics and timeouts are recorded and the run
    /// moves on.
    pub fn run_with(&self, registry: &Registry, progress: &mut dyn ProgressSink) -> RunSummary {
        isolation::install_panic_hook();

        let cases: Vec<Arc<TestCase>> = registry.iter().cloned().collect();
        let started = Instant::now();
        let deadline = self.config.timeout.map(|limit| started + limit);
        let workers = self.config.jobs.max(1).min(cases.len().max(1));
        info!(cases = cases.len(), workers, "run started");
        progress.on_run_start(cases.len());

        let results = if workers == 1 {
            self.run_sequential(&cases, deadline, progress)
        } else {
            match ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("verdict-worker-{i}"))
                .build()
            {
                Ok(pool) => self.run_parallel(&pool, &cases, deadline, progress),
                Err(err) => {
                    warn!(%err, workers, "could not build worker pool; running sequentially");
                    self.run_sequential(&cases, deadline, progress)
                }
            }
        };

        let summary = RunSummary::new(results, started.elapsed());
        info!(
            passed = summary.passed,
            failed = summary.failed,
            errored = summary.errored,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run finished"
        );
        progress.on_run_finished(&summary);
        summary
    }

    fn run_sequential(
        &self,
        cases: &[Arc<TestCase>],
        deadline: Option<Instant>,
        progress: &mut dyn ProgressSink,
    ) -> Vec<TestResult> {
        cases
            .iter()
            .enumerate()
            .map(|(position, case)| {
                let result = self.execute(case, position, deadline);
                progress.on_case_finished(&result);
                result
            })
            .collect()
    }

    /// Cases are spread over the pool; results stream back to this thread so
    /// progress is reported in completion order.
    fn run_parallel(
        &self,
        pool: &ThreadPool,
        cases: &[Arc<TestCase>],
        deadline: Option<Instant>,
        progress: &mut dyn ProgressSink,
    ) -> Vec<TestResult> {
        let (tx, rx) = mpsc::channel();
        pool.in_place_scope(|scope| {
            scope.spawn(move |_| {
                cases.par_iter().enumerate().for_each_with(tx, |tx, (position, case)| {
                    // The receiver only goes away once every result is in.
                    let _ = tx.send(self.execute(case, position, deadline));
                });
            });

            let mut results = Vec::with_capacity(cases.len());
            for result in rx {
                progress.on_case_finished(&result);
                results.push(result);
            }
            results
        })
    }

    fn execute(&self, case: &Arc<TestCase>, position: usize, deadline: Option<Instant>) -> TestResult {
        let started = Instant::now();
        let remaining = deadline.map(|d| d.saturating_duration_since(started));
        if remaining == Some(Duration::ZERO) {
            let failure = Failure::timed_out(case, "timed out: run deadline passed before the case started");
            return TestResult::new(case, position, Duration::ZERO, Outcome::Failed(failure));
        }

        let limit = match (case.group().timeout, remaining) {
            (Some(own), Some(remaining)) => Some(own.min(remaining)),
            (own, remaining) => own.or(remaining),
        };
        let mode = case.group().assertion_mode.unwrap_or(self.config.assertion_mode);
        trace!(case = %case.id(), position, ?limit, "dispatching case");

        let outcome = isolation::run_case(case, mode, position, limit);
        TestResult::new(case, position, started.elapsed(), outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::assert_eq;
    use crate::case::{CaseBody, CaseContext, CaseResult};
    use crate::group::{GroupInfo, Tier};
    use crate::outcome::RunStatus;

    fn registry(bodies: Vec<(&str, Arc<dyn CaseBody>)>) -> Registry {
        let info = Arc::new(GroupInfo {
            name: "TestRunner".to_string(),
            module: "unit/runner".to_string(),
            tier: Tier::Unit,
            assertion_mode: None,
            timeout: None,
        });
        let mut registry = Registry::new();
        for (name, body) in bodies {
            registry.register(TestCase::new(Arc::clone(&info), name, body)).unwrap();
        }
        registry
    }

    fn passing() -> Arc<dyn CaseBody> {
        Arc::new(|cx: &mut CaseContext| -> CaseResult { cx.check(assert_eq(1, 1)) })
    }

    fn failing() -> Arc<dyn CaseBody> {
        Arc::new(|cx: &mut CaseContext| -> CaseResult { cx.check(assert_eq(1, 2)) })
    }

    #[test]
    fn every_case_runs_once_and_the_run_keeps_going() {
        let registry = registry(vec![("test_a", failing()), ("test_b", passing()), ("test_c", passing())]);
        let summary = Runner::default().run(&registry);
        assert_eq!(summary.total, 3);
        assert_eq!((summary.passed, summary.failed, summary.errored), (2, 1, 0));
        assert_eq!(summary.status(), RunStatus::Failed);
    }

    #[test]
    fn parallel_results_come_back_in_registry_order() {
        let names: Vec<String> = (0..12).map(|i| format!("test_{i:02}")).collect();
        let registry = registry(names.iter().map(|n| (n.as_str(), passing())).collect());
        let summary = Runner::new(RunConfig {
            jobs: 4,
            ..RunConfig::default()
        })
        .run(&registry);
        let positions: Vec<usize> = summary.results.iter().map(|r| r.position).collect();
        assert_eq!(positions, (0..12).collect::<Vec<_>>());
    }

    #[derive(Default)]
    struct Recorder {
        finished: Vec<usize>,
    }

    impl ProgressSink for Recorder {
        fn on_case_finished(&mut self, result: &TestResult) {
            self.finished.push(result.position);
        }
    }

    #[test]
    fn the_pool_reports_every_case_to_progress_once() {
        let names: Vec<String> = (0..9).map(|i| format!("test_{i}")).collect();
        let registry = registry(names.iter().map(|n| (n.as_str(), passing())).collect());
        let mut recorder = Recorder::default();
        let summary = Runner::new(RunConfig {
            jobs: 3,
            ..RunConfig::default()
        })
        .run_with(&registry, &mut recorder);

        assert_eq!(summary.passed, 9);
        recorder.finished.sort_unstable();
        assert_eq!(recorder.finished, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn an_empty_registry_is_no_cases() {
        let summary = Runner::default().run(&Registry::new());
        assert_eq!(summary.status(), RunStatus::NoCases);
        assert_eq!(summary.exit_code(), 5);
    }
}
