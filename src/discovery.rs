//! Discoverer: turns a [`Catalog`] into a populated [`Registry`].
//!
//! Nothing is executed during discovery. A group or member is registered only
//! when its name passes the [`NamingConvention`]; everything else is treated as
//! helper code. Parameterized templates are expanded here, table-backed ones after
//! their rows are loaded from the [`TableStore`].

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use crate::case::TestCase;
use crate::catalog::{Catalog, Root};
use crate::errors::{VerdictError, VerdictResult};
use crate::group::{GroupInfo, MemberKind, Tier};
use crate::registry::Registry;
use crate::tables::TableStore;

// ============================================================================
// NAMING CONVENTION
// ============================================================================

/// Allow-list deciding which names denote test groups and test cases.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    pub group_prefixes: Vec<String>,
    pub group_suffixes: Vec<String>,
    pub case_prefixes: Vec<String>,
    pub case_names: Vec<String>,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            group_prefixes: vec!["Test".to_string()],
            group_suffixes: vec!["Tests".to_string(), "_tests".to_string()],
            case_prefixes: vec!["test_".to_string()],
            case_names: vec!["test".to_string()],
        }
    }
}

impl NamingConvention {
    pub fn is_test_group(&self, name: &str) -> bool {
        self.group_prefixes.iter().any(|p| name.starts_with(p.as_str()))
            || self.group_suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }

    pub fn is_test_case(&self, name: &str) -> bool {
        self.case_names.iter().any(|n| n == name)
            || self.case_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

// ============================================================================
// CASE FILTER
// ============================================================================

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Glob(Regex),
}

/// Secondary filter over case identifiers and module paths.
///
/// A plain pattern matches as a substring. A pattern containing `*`, `?` or `[`
/// is an anchored glob, which also accepts the pattern as a literal substring, so
/// an expanded id such as `TestPricing::test_round[up]` selects itself.
#[derive(Debug, Clone)]
pub struct CaseFilter {
    pattern: String,
    matcher: Matcher,
}

impl CaseFilter {
    pub fn parse(pattern: &str) -> VerdictResult<Self> {
        if pattern.is_empty() {
            return Err(VerdictError::invalid_pattern(pattern, "pattern is empty"));
        }
        let matcher = if pattern.contains(['*', '?', '[', ']']) {
            let source = glob_to_regex(pattern)?;
            let regex = Regex::new(&source).map_err(|e| VerdictError::invalid_pattern(pattern, e.to_string()))?;
            Matcher::Glob(regex)
        } else {
            Matcher::Substring(pattern.to_string())
        };
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match &self.matcher {
            Matcher::Substring(needle) => candidate.contains(needle.as_str()),
            Matcher::Glob(regex) => regex.is_match(candidate) || candidate.contains(self.pattern.as_str()),
        }
    }

    /// True if the identifier, the module path or the qualified identifier matches.
    pub fn accepts(&self, case: &TestCase) -> bool {
        self.matches(case.id()) || self.matches(&case.group().module) || self.matches(&case.qualified_id())
    }
}

fn glob_to_regex(pattern: &str) -> VerdictResult<String> {
    let mut out = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    // A `]` right after the opening bracket (or its negation) is literal.
                    let leading = class.is_empty() || class == "!" || class == "^";
                    if c == ']' && !leading {
                        closed = true;
                        break;
                    }
                    class.push(c);
                }
                if !closed {
                    return Err(VerdictError::invalid_pattern(pattern, "unclosed `[`"));
                }
                let (negated, body) = match class.strip_prefix(['!', '^']) {
                    Some(rest) => (true, rest),
                    None => (false, class.as_str()),
                };
                if body.is_empty() {
                    return Err(VerdictError::invalid_pattern(pattern, "empty character class"));
                }
                out.push('[');
                if negated {
                    out.push('^');
                }
                for c in body.chars() {
                    if matches!(c, '\\' | '[' | ']' | '&' | '~') {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push(']');
            }
            ']' => return Err(VerdictError::invalid_pattern(pattern, "unmatched `]`")),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Ok(out)
}

// ============================================================================
// DISCOVERER
// ============================================================================

/// What discovery produced, besides the registry itself.
#[derive(Debug, Default)]
pub struct Discovery {
    pub registry: Registry,
    /// Conditions worth a warning: empty parameter sets, nothing registered.
    pub warnings: Vec<String>,
    /// Groups and members rejected by the naming convention.
    pub ignored: Vec<String>,
    /// Cases that passed the convention but not the tier or pattern filters.
    pub filtered_out: usize,
}

#[derive(Default)]
pub struct Discoverer {
    convention: NamingConvention,
    filter: Option<CaseFilter>,
    tiers: Vec<Tier>,
    tables: TableStore,
}

impl Discoverer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_convention(mut self, convention: NamingConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_filter(mut self, filter: Option<CaseFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Keep only these tiers. Empty keeps every tier.
    pub fn with_tiers(mut self, tiers: Vec<Tier>) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_tables(mut self, tables: TableStore) -> Self {
        self.tables = tables;
        self
    }

    /// Discover every case reachable from `root`.
    ///
    /// Fails fast on a malformed or unknown root, a missing or malformed parameter
    /// table, and a duplicate identifier.
    pub fn discover(&self, catalog: &Catalog, root: &str) -> VerdictResult<Discovery> {
        let root = Root::parse(root)?;
        let mut discovery = Discovery::default();

        for mounted in catalog.select(&root)? {
            let group = &mounted.group;
            let module = mounted.module_path();
            if !self.convention.is_test_group(&group.name) {
                debug!(group = %group.name, module = %module, "group ignored by naming convention");
                discovery.ignored.push(format!("{module}::{}", group.name));
                continue;
            }

            let tier = group
                .tier
                .or_else(|| mounted.module.first().and_then(|s| Tier::from_segment(s)))
                .unwrap_or(Tier::Unit);
            let info = Arc::new(GroupInfo {
                name: group.name.clone(),
                module,
                tier,
                assertion_mode: group.assertion_mode,
                timeout: group.timeout,
            });

            for member in &group.members {
                if !self.convention.is_test_case(&member.name) {
                    debug!(group = %info.name, member = %member.name, "member ignored by naming convention");
                    discovery.ignored.push(format!("{}::{}", info.name, member.name));
                    continue;
                }
                let cases = match &member.kind {
                    MemberKind::Case(body) => {
                        vec![TestCase::new(Arc::clone(&info), member.name.clone(), Arc::clone(body))]
                    }
                    MemberKind::Template(expand) => {
                        let expansions = expand(&self.tables)?;
                        if expansions.is_empty() {
                            let message = format!(
                                "parameter set for {}::{} is empty; no cases registered",
                                info.name, member.name
                            );
                            warn!("{message}");
                            discovery.warnings.push(message);
                        }
                        expansions
                            .into_iter()
                            .map(|e| TestCase::new(Arc::clone(&info), e.name, e.body))
                            .collect()
                    }
                };
                for case in cases {
                    let case = case.with_location(member.location.clone());
                    if !self.selects(&case) {
                        discovery.filtered_out += 1;
                        continue;
                    }
                    discovery.registry.register(case)?;
                }
            }
        }

        if discovery.registry.is_empty() {
            let message = if discovery.filtered_out > 0 {
                format!(
                    "no cases registered: all {} discovered cases were filtered out",
                    discovery.filtered_out
                )
            } else {
                format!("no cases registered: the suite under `{root}` is empty")
            };
            discovery.warnings.push(message);
        }
        debug!(
            registered = discovery.registry.len(),
            ignored = discovery.ignored.len(),
            filtered_out = discovery.filtered_out,
            "discovery finished"
        );
        Ok(discovery)
    }

    fn selects(&self, case: &TestCase) -> bool {
        if !self.tiers.is_empty() && !self.tiers.contains(&case.group().tier) {
            return false;
        }
        self.filter.as_ref().map_or(true, |f| f.accepts(case))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_convention_is_an_allow_list() {
        let convention = NamingConvention::default();
        assert!(convention.is_test_group("TestDiscountCalculator"));
        assert!(convention.is_test_group("DiscountTests"));
        assert!(!convention.is_test_group("DiscountHelpers"));
        assert!(convention.is_test_case("test_applies_discount"));
        assert!(convention.is_test_case("test"));
        assert!(!convention.is_test_case("testify"));
        assert!(!convention.is_test_case("build_calculator"));
    }

    #[test]
    fn plain_patterns_are_substrings() {
        let filter = CaseFilter::parse("discount").unwrap();
        assert!(filter.matches("TestDiscount::test_discount_applies"));
        assert!(!filter.matches("TestStats::test_average"));
    }

    #[test]
    fn glob_patterns_are_anchored() {
        let filter = CaseFilter::parse("integration/*").unwrap();
        assert!(filter.matches("integration/bank"));
        assert!(!filter.matches("unit/integration/bank"));

        let filter = CaseFilter::parse("*::test_average[[]?[]]").unwrap();
        assert!(filter.matches("TestStats::test_average[2]"));
        assert!(!filter.matches("TestStats::test_average[12]"));
    }

    #[test]
    fn expanded_ids_select_themselves() {
        let filter = CaseFilter::parse("TestMixed::test_doubles[2]").unwrap();
        assert!(filter.matches("TestMixed::test_doubles[2]"));
        assert!(filter.matches("TestMixed::test_doubles2"));
        assert!(!filter.matches("TestMixed::test_doubles[1]"));
    }

    #[test]
    fn negated_classes_translate() {
        let filter = CaseFilter::parse("test_[!a]*").unwrap();
        assert!(filter.matches("test_balance"));
        assert!(!filter.matches("test_average"));
    }

    #[test]
    fn malformed_patterns_are_configuration_errors() {
        for pattern in ["", "test_[abc", "test_[]", "test]"] {
            let err = CaseFilter::parse(pattern).unwrap_err();
            assert!(matches!(err, VerdictError::InvalidPattern { .. }), "{pattern}");
        }
    }
}
