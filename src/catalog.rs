//! The code source discovery scans.
//!
//! Groups are mounted under `/`-separated module paths (`unit/discount`,
//! `integration/bank`). A discovery root selects every group whose module path
//! starts with the root's segments; `.` selects everything.

use crate::errors::{VerdictError, VerdictResult};
use crate::group::TestGroup;

/// A group together with the module path it was mounted under.
pub(crate) struct Mounted {
    pub module: Vec<String>,
    pub group: TestGroup,
}

impl Mounted {
    pub fn module_path(&self) -> String {
        self.module.join("/")
    }
}

/// All groups a binary knows about, in mount order.
#[derive(Default)]
pub struct Catalog {
    entries: Vec<Mounted>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `group` under `module`. Empty path segments are dropped.
    pub fn mount(mut self, module: &str, group: TestGroup) -> Self {
        self.add(module, group);
        self
    }

    pub fn add(&mut self, module: &str, group: TestGroup) {
        let module = module
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();
        self.entries.push(Mounted { module, group });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct module paths, in mount order.
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = Vec::new();
        for entry in &self.entries {
            let path = entry.module_path();
            if !modules.contains(&path) {
                modules.push(path);
            }
        }
        modules
    }

    /// Entries under `root`, failing fast when the root selects nothing.
    pub(crate) fn select(&self, root: &Root) -> VerdictResult<Vec<&Mounted>> {
        let selected: Vec<&Mounted> = self
            .entries
            .iter()
            .filter(|entry| root.contains(&entry.module))
            .collect();
        if selected.is_empty() && !root.is_whole_catalog() {
            return Err(VerdictError::RootNotFound {
                root: root.to_string(),
                known: self.modules().join(", "),
            });
        }
        Ok(selected)
    }
}

// ============================================================================
// DISCOVERY ROOT
// ============================================================================

/// A parsed discovery root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    segments: Vec<String>,
}

impl Root {
    /// Parse a root such as `.`, `unit` or `./integration/bank/`.
    pub fn parse(raw: &str) -> VerdictResult<Self> {
        let malformed = |reason: &str| VerdictError::MalformedRoot {
            root: raw.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        let trimmed = trimmed.trim_end_matches('/');
        if trimmed.is_empty() || trimmed == "." {
            return Ok(Self::whole());
        }
        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(malformed("empty path segment"));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(malformed(&format!(
                    "segment `{segment}` may only contain letters, digits, `_` and `-`"
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn whole() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn is_whole_catalog(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn contains(&self, module: &[String]) -> bool {
        module.starts_with(&self.segments)
    }
}

impl std::fmt::Display for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, ".");
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new()
            .mount("unit/discount", TestGroup::new("TestDiscount").build())
            .mount("unit/stats", TestGroup::new("TestStats").build())
            .mount("integration/bank", TestGroup::new("TestBank").build())
    }

    #[test]
    fn roots_select_by_segment_prefix() {
        let catalog = catalog();
        assert_eq!(catalog.select(&Root::parse("unit").unwrap()).unwrap().len(), 2);
        assert_eq!(catalog.select(&Root::parse("./unit/stats/").unwrap()).unwrap().len(), 1);
        assert_eq!(catalog.select(&Root::parse(".").unwrap()).unwrap().len(), 3);
    }

    #[test]
    fn partial_segments_do_not_match() {
        let err = catalog().select(&Root::parse("uni").unwrap()).err().unwrap();
        let VerdictError::RootNotFound { known, .. } = err else {
            panic!("expected root-not-found");
        };
        assert_eq!(known, "unit/discount, unit/stats, integration/bank");
    }

    #[test]
    fn malformed_roots_are_rejected() {
        assert!(matches!(Root::parse("unit//stats"), Err(VerdictError::MalformedRoot { .. })));
        assert!(matches!(Root::parse("unit/st*ts"), Err(VerdictError::MalformedRoot { .. })));
    }

    #[test]
    fn an_empty_catalog_accepts_the_whole_root() {
        assert!(Catalog::new().select(&Root::whole()).unwrap().is_empty());
    }
}
