//! Demo suites, mounted by module path.
//!
//! `unit`, `integration` and `system` hold suites that pass. `faults` holds cases
//! that fail on purpose, one per failure kind the report distinguishes.

use std::thread;
use std::time::Duration;

use verdict::{
    assert_approx_eq, assert_eq, assert_false, assert_panics, assert_raises, assert_true, AssertionMode, Catalog,
    ParameterSet, TestGroup,
};

use crate::subjects::{
    average, broken_average, temperature_range, Bank, DiscountCalculator, DiscountError, InMemoryLedger, Ledger,
    StatsError, TransferError,
};

pub fn catalog() -> Catalog {
    Catalog::new()
        .mount("unit/discount", discount_calculator())
        .mount("unit/discount", discount_helpers())
        .mount("unit/stats", weather_stats())
        .mount("integration/bank", transfers())
        .mount("system/checkout", checkout_smoke())
        .mount("faults/averages", broken_average_suite())
        .mount("faults/crashes", crashes())
        .mount("faults/hangs", hangs())
        .mount("faults/soft", soft_assertions())
        .mount("faults/teardown", leaky_fixture())
        .mount("faults/pending", pending())
}

// ============================================================================
// UNIT
// ============================================================================

fn discount_calculator() -> TestGroup {
    TestGroup::new("TestDiscountCalculator")
        .case("test_applies_percentage", |_, cx| {
            let calculator = DiscountCalculator::new(20.0)?;
            cx.check(assert_approx_eq(80.0, calculator.apply(100.0), 1e-9))
        })
        .case("test_zero_rate_keeps_price", |_, cx| {
            let calculator = DiscountCalculator::new(0.0)?;
            cx.check(assert_eq(59.99, calculator.apply(59.99)))
        })
        .case("test_rejects_rate_above_100", |_, cx| {
            cx.check(assert_raises!(
                DiscountCalculator::new(120.0),
                DiscountError::OutOfRange { .. }
            ))
        })
        .parameterized(
            "test_discounted_price",
            ParameterSet::new()
                .labelled("ten_percent", (10.0, 50.0), 45.0)
                .labelled("half", (50.0, 19.99), 9.995)
                .labelled("everything", (100.0, 12.0), 0.0),
            |_, cx, &(rate, price): &(f64, f64), expected: &f64| {
                let calculator = DiscountCalculator::new(rate)?;
                cx.check(assert_approx_eq(*expected, calculator.apply(price), 1e-9))
            },
        )
        // Not a test by name, so never run.
        .case("build_calculator_for_docs", |_, _| panic!("helpers are never executed"))
        .build()
}

/// Does not match the group naming convention; discovery skips it entirely.
fn discount_helpers() -> TestGroup {
    TestGroup::new("DiscountHelpers")
        .case("test_looks_like_a_test", |_, _| panic!("helper groups are never executed"))
        .build()
}

fn weather_stats() -> TestGroup {
    TestGroup::new("TestWeatherStats")
        .parameterized(
            "test_average",
            ParameterSet::new()
                .row(vec![1.0, 2.0, 3.0], 2.0)
                .row(vec![-5.0, 5.0], 0.0)
                .labelled("single_reading", vec![21.5], 21.5),
            |_, cx, readings: &Vec<f64>, expected: &f64| cx.check(assert_approx_eq(*expected, average(readings)?, 1e-9)),
        )
        .table(
            "test_average_from_table",
            "weather/averages",
            |_, cx, readings: &Vec<f64>, expected: &f64| cx.check(assert_approx_eq(*expected, average(readings)?, 1e-9)),
        )
        .table(
            "test_range_from_table",
            "weather/ranges",
            |_, cx, readings: &Vec<f64>, expected: &(f64, f64)| cx.check(assert_eq(*expected, temperature_range(readings)?)),
        )
        .case("test_average_of_nothing_is_an_error", |_, cx| {
            cx.check(assert_raises!(average(&[]), StatsError::NoReadings))
        })
        .case("test_range_orders_bounds", |_, cx| {
            let (low, high) = temperature_range(&[3.0, -1.0, 7.5])?;
            cx.check(assert_true(low <= high))?;
            cx.check(assert_eq((-1.0, 7.5), (low, high)))
        })
        .build()
}

// ============================================================================
// INTEGRATION
// ============================================================================

fn seeded_bank() -> Bank<InMemoryLedger> {
    Bank::new(InMemoryLedger::with_balances([("alice", 100), ("bob", 20)]))
}

fn transfers() -> TestGroup {
    TestGroup::with_fixture("TestTransfers", seeded_bank)
        .teardown(|mut bank| bank.ledger_mut().clear())
        .case("test_transfer_moves_funds", |bank, cx| {
            bank.transfer("alice", "bob", 30)?;
            cx.check(assert_eq(Some(70), bank.ledger().balance("alice")))?;
            cx.check(assert_eq(Some(50), bank.ledger().balance("bob")))
        })
        .case("test_transfer_is_recorded", |bank, cx| {
            bank.transfer("bob", "alice", 5)?;
            cx.check(assert_eq(1, bank.ledger().entries().len()))
        })
        .case("test_overdraft_is_rejected", |bank, cx| {
            cx.check(assert_raises!(
                bank.transfer("bob", "alice", 500),
                TransferError::InsufficientFunds { requested: 500, .. }
            ))?;
            cx.check(assert_eq(Some(20), bank.ledger().balance("bob")).context("balance after a rejected transfer"))
        })
        .case("test_unknown_account_is_rejected", |bank, cx| {
            cx.check(assert_raises!(
                bank.transfer("mallory", "bob", 1),
                TransferError::UnknownAccount(who) if who == "mallory"
            ))
        })
        .case("test_every_case_sees_a_fresh_ledger", |bank, cx| {
            cx.check(assert_true(bank.ledger().entries().is_empty()))
        })
        .build()
}

// ============================================================================
// SYSTEM
// ============================================================================

fn checkout_smoke() -> TestGroup {
    TestGroup::with_fixture("TestCheckoutSmoke", seeded_bank)
        .case("test_discounted_purchase_is_paid", |bank, cx| {
            let price = DiscountCalculator::new(25.0)?.apply(40.0);
            cx.check(assert_approx_eq(30.0, price, 1e-9))?;
            bank.transfer("alice", "bob", price as u64)?;
            cx.check(assert_eq(Some(70), bank.ledger().balance("alice")))?;
            cx.check(assert_false(bank.ledger().entries().is_empty()))
        })
        .build()
}

// ============================================================================
// FAULTS
// ============================================================================

fn broken_average_suite() -> TestGroup {
    TestGroup::new("TestBrokenAverage")
        .parameterized(
            "test_average",
            ParameterSet::new().labelled("average_of_1_2_3_is_2", vec![1.0, 2.0, 3.0], 2.0),
            |_, cx, readings: &Vec<f64>, expected: &f64| cx.check(assert_eq(*expected, broken_average(readings))),
        )
        .build()
}

fn crashes() -> TestGroup {
    TestGroup::new("TestCrashes")
        .case("test_subject_panics", |_, cx| {
            let readings: Vec<f64> = Vec::new();
            cx.check(assert_eq(0.0, readings[0]))
        })
        .case("test_subject_returns_an_error", |_, cx| {
            let parsed: i32 = "twenty".parse()?;
            cx.check(assert_eq(20, parsed))
        })
        .case("test_expected_panic_passes", |_, cx| {
            cx.check(assert_panics(|| {
                let readings: Vec<f64> = Vec::new();
                readings[0]
            }))
        })
        .build()
}

fn hangs() -> TestGroup {
    TestGroup::new("TestHangs")
        .timeout(Duration::from_millis(500))
        .case("test_never_returns", |_, _| loop {
            thread::sleep(Duration::from_millis(25));
        })
        .case("test_finishes_in_time", |_, cx| {
            thread::sleep(Duration::from_millis(10));
            cx.check(assert_true(true))
        })
        .build()
}

fn soft_assertions() -> TestGroup {
    TestGroup::new("TestSoftAssertions")
        .assertion_mode(AssertionMode::Collect)
        .case("test_reports_every_violation", |_, cx| {
            cx.check(assert_eq(3, 1 + 1))?;
            cx.check(assert_true("forecast".is_empty()))?;
            cx.check(assert_eq("sunny", "sunny"))
        })
        .build()
}

fn leaky_fixture() -> TestGroup {
    TestGroup::with_fixture("TestLeakyFixture", || "socket".to_string())
        .teardown(|_| panic!("fixture could not release its socket"))
        .case("test_passes_but_teardown_fails", |socket, cx| cx.check(assert_eq("socket", socket.as_str())))
        .build()
}

fn pending() -> TestGroup {
    TestGroup::new("TestPending")
        .parameterized(
            "test_forecast",
            ParameterSet::<Vec<f64>, f64>::new(),
            |_, cx, readings: &Vec<f64>, expected: &f64| cx.check(assert_approx_eq(*expected, average(readings)?, 1e-9)),
        )
        .build()
}
