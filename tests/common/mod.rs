//! Shared builders for the behaviour-level tests.
#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use verdict::{assert_eq, Catalog, Discoverer, Discovery, ParameterSet, Registry, TestGroup};

/// Discover everything under `root` with default settings.
pub fn discover(catalog: &Catalog, root: &str) -> Discovery {
    Discoverer::new()
        .discover(catalog, root)
        .unwrap_or_else(|e| panic!("discovery of `{root}` failed: {e}"))
}

pub fn registry(catalog: &Catalog) -> Registry {
    discover(catalog, ".").registry
}

/// `n` passing cases that each sleep `pause`.
pub fn sleepy_group(name: &str, n: usize, pause: Duration) -> TestGroup {
    (0..n)
        .fold(TestGroup::new(name), |group, i| {
            group.case(format!("test_sleep_{i:03}"), move |_, cx| {
                thread::sleep(pause);
                cx.check(assert_eq(i, i))
            })
        })
        .build()
}

/// A passing and a failing row of the same template.
pub fn mixed_group() -> TestGroup {
    TestGroup::new("TestMixed")
        .case("test_passes", |_, cx| cx.check(assert_eq(4, 2 + 2)))
        .parameterized(
            "test_doubles",
            ParameterSet::new().row(1, 2).row(2, 4).row(3, 7).row(4, 8),
            |_, cx, input: &i32, expected: &i32| cx.check(assert_eq(*expected, input * 2)),
        )
        .build()
}
