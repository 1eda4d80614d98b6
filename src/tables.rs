//! Parameter tables loaded from a data directory.
//!
//! Every `*.yaml`, `*.yml` or `*.json` file under the directory is one table: a list
//! of `{ label?, input, expected }` rows. Tables are named by their path relative
//! to the directory without the extension, so `weather/averages.yaml` is the table
//! `weather/averages`. Rows are kept untyped until a template asks for them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{VerdictError, VerdictResult};
use crate::params::{ParameterSet, Row};

enum TableData {
    Yaml(serde_yaml::Value),
    Json(serde_json::Value),
}

struct Table {
    path: PathBuf,
    data: TableData,
}

/// Tables available to table-backed templates during discovery.
#[derive(Default)]
pub struct TableStore {
    tables: BTreeMap<String, Table>,
}

impl TableStore {
    /// A store with no tables; any table-backed template fails discovery.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Walk `dir` and parse every table file in it.
    ///
    /// Files are visited in sorted order so that a name clash is always reported
    /// against the same pair of files.
    pub fn load_dir(dir: impl AsRef<Path>) -> VerdictResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(VerdictError::DataDirNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut store = Self::empty();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| VerdictError::table_load(dir, e))?;
            if !entry.file_type().is_file() || !is_table_file(entry.path()) {
                continue;
            }
            let path = entry.path();
            let name = table_name(dir, path);
            let source = fs::read_to_string(path).map_err(|e| VerdictError::table_load(path, e))?;
            let data = parse_table(path, &source)?;
            store.insert(name, path.to_path_buf(), data)?;
        }
        debug!(dir = %dir.display(), tables = store.tables.len(), "loaded parameter tables");
        Ok(store)
    }

    /// Add a YAML table from memory.
    pub fn insert_yaml(&mut self, name: &str, source: &str) -> VerdictResult<()> {
        let path = PathBuf::from(format!("<memory>/{name}.yaml"));
        let data = serde_yaml::from_str(source).map_err(|e| VerdictError::table_load(&path, e))?;
        self.insert(name.to_string(), path, TableData::Yaml(data))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Deserialize table `name` into typed rows for `template`.
    pub fn parameter_set<I, E>(&self, name: &str, template: &str) -> VerdictResult<ParameterSet<I, E>>
    where
        I: DeserializeOwned,
        E: DeserializeOwned,
    {
        let table = self.tables.get(name).ok_or_else(|| VerdictError::MissingTable {
            table: name.to_string(),
            template: template.to_string(),
        })?;
        let rows: Vec<Row<I, E>> = match &table.data {
            TableData::Yaml(value) => {
                serde_yaml::from_value(value.clone()).map_err(|e| VerdictError::table_load(&table.path, e))?
            }
            TableData::Json(value) => {
                serde_json::from_value(value.clone()).map_err(|e| VerdictError::table_load(&table.path, e))?
            }
        };
        Ok(ParameterSet::from_rows(rows))
    }

    fn insert(&mut self, name: String, path: PathBuf, data: TableData) -> VerdictResult<()> {
        if let Some(existing) = self.tables.get(&name) {
            return Err(VerdictError::table_load(
                &path,
                format!("table `{name}` is already defined by {}", existing.path.display()),
            ));
        }
        self.tables.insert(name, Table { path, data });
        Ok(())
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn is_table_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
}

fn table_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_table(path: &Path, source: &str) -> VerdictResult<TableData> {
    if path.extension().is_some_and(|ext| ext == "json") {
        let value = serde_json::from_str(source).map_err(|e| VerdictError::table_load(path, e))?;
        return Ok(TableData::Json(value));
    }
    let value = serde_yaml::from_str(source).map_err(|e| VerdictError::table_load(path, e))?;
    Ok(TableData::Yaml(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_named_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("weather")).unwrap();
        fs::write(
            dir.path().join("weather/averages.yaml"),
            "- input: [1.0, 2.0, 3.0]\n  expected: 2.0\n",
        )
        .unwrap();
        fs::write(dir.path().join("lengths.json"), r#"[{"input": "ab", "expected": 2}]"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a table").unwrap();

        let store = TableStore::load_dir(dir.path()).unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), ["lengths", "weather/averages"]);

        let set: ParameterSet<Vec<f64>, f64> = store.parameter_set("weather/averages", "T::test").unwrap();
        assert_eq!(set.rows()[0].expected, 2.0);
    }

    #[test]
    fn missing_directory_is_a_configuration_error() {
        let err = TableStore::load_dir("/definitely/not/here").err().unwrap();
        assert!(matches!(err, VerdictError::DataDirNotFound { .. }));
    }

    #[test]
    fn unknown_table_names_the_template() {
        let store = TableStore::empty();
        let err = store
            .parameter_set::<i32, i32>("prices", "TestDiscount::test_prices")
            .unwrap_err();
        let VerdictError::MissingTable { table, template } = err else {
            panic!("expected a missing-table error");
        };
        assert_eq!(table, "prices");
        assert_eq!(template, "TestDiscount::test_prices");
    }

    #[test]
    fn rows_of_the_wrong_shape_fail_to_load() {
        let mut store = TableStore::empty();
        store.insert_yaml("prices", "- input: cheap\n  expected: 1\n").unwrap();
        let err = store.parameter_set::<i32, i32>("prices", "T::test").unwrap_err();
        assert!(matches!(err, VerdictError::TableLoad { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prices.yaml"), "[]").unwrap();
        fs::write(dir.path().join("prices.json"), "[]").unwrap();
        let err = TableStore::load_dir(dir.path()).err().unwrap();
        assert!(err.to_string().contains("already defined"));
    }
}
