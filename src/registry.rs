//! Test Registry: identifier -> case, in insertion order.
//!
//! Registering an identifier twice is a configuration error. Silently replacing
//! a case would hide it from the run.

use std::collections::HashMap;
use std::sync::Arc;

use crate::case::TestCase;
use crate::errors::{VerdictError, VerdictResult};

#[derive(Debug, Default)]
pub struct Registry {
    cases: Vec<Arc<TestCase>>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, case: TestCase) -> VerdictResult<()> {
        if self.index.contains_key(case.id()) {
            return Err(VerdictError::DuplicateCase {
                id: case.id().to_string(),
            });
        }
        self.index.insert(case.id().to_string(), self.cases.len());
        self.cases.push(Arc::new(case));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<TestCase>> {
        self.index.get(id).map(|&i| &self.cases[i])
    }

    /// Cases in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TestCase>> {
        self.cases.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.id())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{CaseBody, CaseContext, CaseResult};
    use crate::group::{GroupInfo, Tier};

    fn case(group: &str, name: &str) -> TestCase {
        let info = Arc::new(GroupInfo {
            name: group.to_string(),
            module: String::new(),
            tier: Tier::Unit,
            assertion_mode: None,
            timeout: None,
        });
        let body: Arc<dyn CaseBody> = Arc::new(|_: &mut CaseContext| -> CaseResult { Ok(()) });
        TestCase::new(info, name, body)
    }

    #[test]
    fn keeps_insertion_order() {
        let mut registry = Registry::new();
        for name in ["test_c", "test_a", "test_b"] {
            registry.register(case("TestOrder", name)).unwrap();
        }
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids, ["TestOrder::test_c", "TestOrder::test_a", "TestOrder::test_b"]);
        assert!(registry.get("TestOrder::test_a").is_some());
    }

    #[test]
    fn rejects_duplicates_without_overwriting() {
        let mut registry = Registry::new();
        registry.register(case("TestDup", "test_x")).unwrap();
        let err = registry.register(case("TestDup", "test_x")).unwrap_err();
        assert!(matches!(err, VerdictError::DuplicateCase { ref id } if id == "TestDup::test_x"));
        assert_eq!(registry.len(), 1);
    }
}
