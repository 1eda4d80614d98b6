//! Test groups: named containers of cases sharing a fixture and a subject area.
//!
//! A group is built with [`TestGroup::new`] (no fixture) or
//! [`TestGroup::with_fixture`]. The fixture's `setup` closure runs once per case,
//! inside the case's own thread, so no case can observe state left behind by
//! another. Fakes and doubles are plain values produced by `setup`.
//!
//! Members are recorded by name only; which of them are tests is decided later by
//! discovery, against the naming convention.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::case::{AssertionMode, CaseBody, CaseContext, CaseError, CaseResult, SourceLocation};
use crate::errors::VerdictResult;
use crate::params::{self, Expanded, ExpandedBody, ParameterSet, Template};
use crate::runner::{panic_message, preserving_panic_location};
use crate::tables::TableStore;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Scope and cost class of a test, used to partition a suite.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Unit,
    Integration,
    System,
}

impl Tier {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "unit" => Some(Tier::Unit),
            "integration" => Some(Tier::Integration),
            "system" => Some(Tier::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Unit => "unit",
            Tier::Integration => "integration",
            Tier::System => "system",
        }
    }
}

/// Metadata every case of a group shares once it is registered.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    pub name: String,
    /// `/`-separated module path the group was mounted under.
    pub module: String,
    pub tier: Tier,
    /// Pinned assertion mode; `None` defers to the run configuration.
    pub assertion_mode: Option<AssertionMode>,
    /// Time limit applied to each case of the group.
    pub timeout: Option<Duration>,
}

/// A case body expanded by discovery, possibly after loading a parameter table.
pub(crate) struct Expansion {
    pub name: String,
    pub body: Arc<dyn CaseBody>,
}

type Expander = Arc<dyn Fn(&TableStore) -> VerdictResult<Vec<Expansion>> + Send + Sync>;

pub(crate) enum MemberKind {
    Case(Arc<dyn CaseBody>),
    Template(Expander),
}

/// A named member of a group: a plain case or a parameterized template.
pub(crate) struct Member {
    pub name: String,
    pub location: SourceLocation,
    pub kind: MemberKind,
}

/// A finished group, ready to be mounted in a [`crate::catalog::Catalog`].
pub struct TestGroup {
    pub(crate) name: String,
    pub(crate) tier: Option<Tier>,
    pub(crate) assertion_mode: Option<AssertionMode>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) members: Vec<Member>,
}

impl TestGroup {
    /// Start a group without fixture state; bodies receive `&mut ()`.
    pub fn new(name: impl Into<String>) -> GroupBuilder<()> {
        GroupBuilder::new(name.into(), Arc::new(|| ()))
    }

    /// Start a group whose cases each receive a freshly built fixture.
    pub fn with_fixture<F, S>(name: impl Into<String>, setup: S) -> GroupBuilder<F>
    where
        F: 'static,
        S: Fn() -> F + Send + Sync + 'static,
    {
        GroupBuilder::new(name.into(), Arc::new(setup))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of all members, tests and helpers alike, in declaration order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name.as_str())
    }
}

// ============================================================================
// BUILDER
// ============================================================================

type Body<F> = ExpandedBody<F>;
type RawExpander<F> = Arc<dyn Fn(&TableStore) -> VerdictResult<Vec<Expanded<F>>> + Send + Sync>;

enum RawMember<F> {
    Case(Body<F>),
    Template(RawExpander<F>),
}

struct Fixture<F> {
    setup: Arc<dyn Fn() -> F + Send + Sync>,
    teardown: Option<Arc<dyn Fn(F) + Send + Sync>>,
}

/// Builder for a [`TestGroup`] with fixture type `F`.
pub struct GroupBuilder<F> {
    name: String,
    tier: Option<Tier>,
    assertion_mode: Option<AssertionMode>,
    timeout: Option<Duration>,
    setup: Arc<dyn Fn() -> F + Send + Sync>,
    teardown: Option<Arc<dyn Fn(F) + Send + Sync>>,
    members: Vec<(String, SourceLocation, RawMember<F>)>,
}

impl<F: 'static> GroupBuilder<F> {
    fn new(name: String, setup: Arc<dyn Fn() -> F + Send + Sync>) -> Self {
        Self {
            name,
            tier: None,
            assertion_mode: None,
            timeout: None,
            setup,
            teardown: None,
            members: Vec::new(),
        }
    }

    /// Pin the tier instead of inferring it from the module path.
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn assertion_mode(mut self, mode: AssertionMode) -> Self {
        self.assertion_mode = Some(mode);
        self
    }

    /// Time limit for each case in the group.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Consume the fixture after each case body, whatever its outcome.
    pub fn teardown<T>(mut self, teardown: T) -> Self
    where
        T: Fn(F) + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(teardown));
        self
    }

    #[track_caller]
    pub fn case<B>(mut self, name: impl Into<String>, body: B) -> Self
    where
        B: Fn(&mut F, &mut CaseContext) -> CaseResult + Send + Sync + 'static,
    {
        self.members
            .push((name.into(), SourceLocation::caller(), RawMember::Case(Arc::new(body))));
        self
    }

    /// One case per row of `set`, named `<name>[<label or index>]`.
    #[track_caller]
    pub fn parameterized<I, E, T>(mut self, name: impl Into<String>, set: ParameterSet<I, E>, template: T) -> Self
    where
        I: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        T: Fn(&mut F, &mut CaseContext, &I, &E) -> CaseResult + Send + Sync + 'static,
    {
        let name = name.into();
        let template: Template<F, I, E> = Arc::new(template);
        let prefix = name.clone();
        let expander: RawExpander<F> =
            Arc::new(move |_: &TableStore| -> VerdictResult<Vec<Expanded<F>>> {
                Ok(params::expand(&prefix, &set, &template))
            });
        self.members
            .push((name, SourceLocation::caller(), RawMember::Template(expander)));
        self
    }

    /// Like [`GroupBuilder::parameterized`], with rows read from the data table
    /// `table` at discovery time.
    #[track_caller]
    pub fn table<I, E, T>(mut self, name: impl Into<String>, table: impl Into<String>, template: T) -> Self
    where
        I: Clone + DeserializeOwned + Send + Sync + 'static,
        E: Clone + DeserializeOwned + Send + Sync + 'static,
        T: Fn(&mut F, &mut CaseContext, &I, &E) -> CaseResult + Send + Sync + 'static,
    {
        let name = name.into();
        let table = table.into();
        let template: Template<F, I, E> = Arc::new(template);
        let group = self.name.clone();
        let prefix = name.clone();
        let expander: RawExpander<F> = Arc::new(move |store: &TableStore| -> VerdictResult<Vec<Expanded<F>>> {
            let set: ParameterSet<I, E> = store.parameter_set(&table, &format!("{group}::{prefix}"))?;
            Ok(params::expand(&prefix, &set, &template))
        });
        self.members
            .push((name, SourceLocation::caller(), RawMember::Template(expander)));
        self
    }

    pub fn build(self) -> TestGroup {
        let fixture = Arc::new(Fixture {
            setup: self.setup,
            teardown: self.teardown,
        });
        let members = self
            .members
            .into_iter()
            .map(|(name, location, raw)| {
                let kind = match raw {
                    RawMember::Case(body) => MemberKind::Case(bind(&fixture, body)),
                    RawMember::Template(expand) => {
                        let fixture = Arc::clone(&fixture);
                        MemberKind::Template(Arc::new(
                            move |store: &TableStore| -> VerdictResult<Vec<Expansion>> {
                                Ok(expand(store)?
                                    .into_iter()
                                    .map(|expanded| Expansion {
                                        name: expanded.name,
                                        body: bind(&fixture, expanded.body),
                                    })
                                    .collect())
                            },
                        ))
                    }
                };
                Member {
                    name,
                    location,
                    kind,
                }
            })
            .collect();
        TestGroup {
            name: self.name,
            tier: self.tier,
            assertion_mode: self.assertion_mode,
            timeout: self.timeout,
            members,
        }
    }
}

// ============================================================================
// FIXTURE BINDING
// ============================================================================

struct FixtureCase<F> {
    fixture: Arc<Fixture<F>>,
    body: Body<F>,
}

fn bind<F: 'static>(fixture: &Arc<Fixture<F>>, body: Body<F>) -> Arc<dyn CaseBody> {
    Arc::new(FixtureCase {
        fixture: Arc::clone(fixture),
        body,
    })
}

impl<F> CaseBody for FixtureCase<F> {
    fn invoke(&self, cx: &mut CaseContext) -> CaseResult {
        let mut state = (self.fixture.setup)();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.body)(&mut state, cx)));
        let torn_down = match &self.fixture.teardown {
            Some(teardown) => {
                preserving_panic_location(|| panic::catch_unwind(AssertUnwindSafe(|| teardown(state))))
            }
            None => Ok(()),
        };
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        };
        match (result, torn_down) {
            (Ok(()), Err(payload)) => Err(CaseError::Unexpected {
                message: format!("teardown panicked: {}", panic_message(&payload)),
                origin: "teardown".to_string(),
                violations: Vec::new(),
            }),
            (result, _) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn only_case(group: &TestGroup) -> Arc<dyn CaseBody> {
        match &group.members[0].kind {
            MemberKind::Case(body) => Arc::clone(body),
            MemberKind::Template(_) => panic!("expected a plain case"),
        }
    }

    #[test]
    fn every_invocation_gets_a_fresh_fixture() {
        let group = TestGroup::with_fixture("TestCounter", || vec![0u8])
            .case("test_push", |fx, cx| {
                fx.push(1);
                cx.check(assert_eq(2, fx.len()))
            })
            .build();
        let body = only_case(&group);
        for _ in 0..3 {
            let mut cx = CaseContext::new("TestCounter::test_push", AssertionMode::FailFast);
            assert!(body.invoke(&mut cx).is_ok());
        }
    }

    #[test]
    fn teardown_runs_even_when_the_body_fails() {
        static TORN_DOWN: AtomicUsize = AtomicUsize::new(0);
        let group = TestGroup::with_fixture("TestTeardown", || 5)
            .teardown(|_| {
                TORN_DOWN.fetch_add(1, Ordering::SeqCst);
            })
            .case("test_fails", |fx, cx| cx.check(assert_eq(6, *fx)))
            .build();
        let mut cx = CaseContext::new("TestTeardown::test_fails", AssertionMode::FailFast);
        assert!(only_case(&group).invoke(&mut cx).is_err());
        assert_eq!(TORN_DOWN.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_teardown_turns_a_pass_into_an_error() {
        let group = TestGroup::with_fixture("TestTeardown", || ())
            .teardown(|_| panic!("socket already closed"))
            .case("test_ok", |_, _| Ok(()))
            .build();
        let mut cx = CaseContext::new("TestTeardown::test_ok", AssertionMode::FailFast);
        let Err(CaseError::Unexpected { message, origin, .. }) = only_case(&group).invoke(&mut cx) else {
            panic!("expected a teardown error");
        };
        assert_eq!(origin, "teardown");
        assert!(message.contains("socket already closed"));
    }
}
