mod common;

use std::fs;

use verdict::discovery::CaseFilter;
use verdict::{assert_eq, Catalog, Discoverer, ParameterSet, TableStore, TestGroup, Tier, VerdictError};

fn suite() -> Catalog {
    Catalog::new()
        .mount(
            "unit/discount",
            TestGroup::new("TestDiscount")
                .case("test_applies", |_, cx| cx.check(assert_eq(1, 1)))
                .case("helper_builds_prices", |_, _| panic!("helpers must never run"))
                .case("testing_is_not_a_prefix_match", |_, _| panic!("not a test name"))
                .build(),
        )
        .mount(
            "unit/discount",
            TestGroup::new("PriceHelpers")
                .case("test_inside_a_helper_group", |_, _| panic!("helper groups must never run"))
                .build(),
        )
        .mount(
            "integration/bank",
            TestGroup::new("BankTests")
                .case("test_transfer", |_, cx| cx.check(assert_eq(2, 2)))
                .build(),
        )
        .mount("misc", TestGroup::new("TestMisc").case("test", |_, _| Ok(())).build())
}

#[test]
fn only_names_on_the_allow_list_are_registered() {
    let discovery = common::discover(&suite(), ".");
    let ids: Vec<_> = discovery.registry.ids().collect();
    assert_eq!(ids, ["TestDiscount::test_applies", "BankTests::test_transfer", "TestMisc::test"]);
    assert!(discovery.ignored.contains(&"TestDiscount::helper_builds_prices".to_string()));
    assert!(discovery.ignored.contains(&"unit/discount::PriceHelpers".to_string()));
    assert!(discovery.warnings.is_empty());
}

#[test]
fn roots_restrict_discovery_to_a_subtree() {
    let discovery = common::discover(&suite(), "integration");
    let ids: Vec<_> = discovery.registry.ids().collect();
    assert_eq!(ids, ["BankTests::test_transfer"]);
}

#[test]
fn tiers_come_from_the_module_path_unless_pinned() {
    let catalog = suite().mount(
        "unit/slow",
        TestGroup::new("TestSlow")
            .tier(Tier::System)
            .case("test_end_to_end", |_, _| Ok(()))
            .build(),
    );
    let discovery = common::discover(&catalog, ".");
    let tier_of = |id: &str| discovery.registry.get(id).unwrap().group().tier;
    assert_eq!(tier_of("TestDiscount::test_applies"), Tier::Unit);
    assert_eq!(tier_of("BankTests::test_transfer"), Tier::Integration);
    assert_eq!(tier_of("TestMisc::test"), Tier::Unit);
    assert_eq!(tier_of("TestSlow::test_end_to_end"), Tier::System);

    let only_system = Discoverer::new()
        .with_tiers(vec![Tier::System])
        .discover(&catalog, ".")
        .unwrap();
    assert_eq!(only_system.registry.ids().collect::<Vec<_>>(), ["TestSlow::test_end_to_end"]);
}

#[test]
fn filters_match_ids_and_module_paths() {
    let by_module = Discoverer::new()
        .with_filter(Some(CaseFilter::parse("integration/*").unwrap()))
        .discover(&suite(), ".")
        .unwrap();
    assert_eq!(by_module.registry.ids().collect::<Vec<_>>(), ["BankTests::test_transfer"]);

    let by_id = Discoverer::new()
        .with_filter(Some(CaseFilter::parse("applies").unwrap()))
        .discover(&suite(), ".")
        .unwrap();
    assert_eq!(by_id.registry.ids().collect::<Vec<_>>(), ["TestDiscount::test_applies"]);
}

#[test]
fn a_reported_case_id_works_as_a_filter() {
    let catalog = Catalog::new().mount("unit", common::mixed_group());
    let discovery = Discoverer::new()
        .with_filter(Some(CaseFilter::parse("TestMixed::test_doubles[2]").unwrap()))
        .discover(&catalog, ".")
        .unwrap();
    assert_eq!(discovery.registry.ids().collect::<Vec<_>>(), ["TestMixed::test_doubles[2]"]);
    assert!(discovery.warnings.is_empty());
}

#[test]
fn filtering_everything_out_is_a_warning_not_an_error() {
    let discovery = Discoverer::new()
        .with_filter(Some(CaseFilter::parse("no_such_case").unwrap()))
        .discover(&suite(), ".")
        .unwrap();
    assert!(discovery.registry.is_empty());
    assert_eq!(discovery.filtered_out, 3);
    assert!(discovery.warnings[0].contains("filtered out"));
}

#[test]
fn bad_roots_fail_fast() {
    let err = Discoverer::new().discover(&suite(), "system").unwrap_err();
    assert!(matches!(err, VerdictError::RootNotFound { .. }));

    let err = Discoverer::new().discover(&suite(), "unit/../bank").unwrap_err();
    assert!(matches!(err, VerdictError::MalformedRoot { .. }));
}

#[test]
fn duplicate_ids_are_a_configuration_error() {
    let catalog = suite().mount(
        "integration/other",
        TestGroup::new("BankTests")
            .case("test_transfer", |_, _| Ok(()))
            .build(),
    );
    let err = Discoverer::new().discover(&catalog, ".").unwrap_err();
    assert!(matches!(err, VerdictError::DuplicateCase { ref id } if id == "BankTests::test_transfer"));
}

#[test]
fn parameterized_ids_follow_row_order() {
    let catalog = Catalog::new().mount("unit", common::mixed_group());
    let ids: Vec<_> = common::registry(&catalog).ids().map(str::to_string).collect();
    assert_eq!(
        ids,
        [
            "TestMixed::test_passes",
            "TestMixed::test_doubles[0]",
            "TestMixed::test_doubles[1]",
            "TestMixed::test_doubles[2]",
            "TestMixed::test_doubles[3]",
        ]
    );
}

#[test]
fn empty_parameter_sets_register_nothing_and_warn() {
    let catalog = Catalog::new().mount(
        "unit",
        TestGroup::new("TestPending")
            .parameterized(
                "test_later",
                ParameterSet::<i32, i32>::new(),
                |_, cx, input: &i32, expected: &i32| cx.check(assert_eq(*expected, *input)),
            )
            .build(),
    );
    let discovery = common::discover(&catalog, ".");
    assert!(discovery.registry.is_empty());
    assert_eq!(
        discovery.warnings[0],
        "parameter set for TestPending::test_later is empty; no cases registered"
    );
}

#[test]
fn table_backed_templates_expand_from_the_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("pricing")).unwrap();
    fs::write(
        dir.path().join("pricing/rounding.yaml"),
        "- label: up\n  input: 2.5\n  expected: 3\n- input: 2.4\n  expected: 2\n",
    )
    .unwrap();
    let catalog = Catalog::new().mount(
        "unit/pricing",
        TestGroup::new("TestRounding")
            .table("test_round", "pricing/rounding", |_, cx, input: &f64, expected: &i64| {
                cx.check(assert_eq(*expected, input.round() as i64))
            })
            .build(),
    );

    let discovery = Discoverer::new()
        .with_tables(TableStore::load_dir(dir.path()).unwrap())
        .discover(&catalog, ".")
        .unwrap();
    let ids: Vec<_> = discovery.registry.ids().collect();
    assert_eq!(ids, ["TestRounding::test_round[up]", "TestRounding::test_round[1]"]);

    let err = Discoverer::new().discover(&catalog, ".").unwrap_err();
    assert!(matches!(err, VerdictError::MissingTable { ref table, .. } if table == "pricing/rounding"));
}
