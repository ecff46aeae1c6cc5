//! Fixture data: static key→record test data, loaded once per run.
//!
//! The store is read-only after load; scenarios reach fixture records by
//! binding them to aliases (`bind_fixture`) and dereferencing `@alias.path`
//! expressions.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

#[derive(Default)]
pub struct FixtureStore {
    fixtures: HashMap<String, Value>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file under `dir`; the file stem becomes the
    /// fixture name
    pub fn load_dir(dir: &Path) -> HarnessResult<Self> {
        let mut store = Self::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        {
            let name = entry
                .path()
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let content = std::fs::read_to_string(entry.path())?;
            let value: Value = serde_json::from_str(&content)?;
            debug!(fixture = %name, "fixture loaded");
            store.fixtures.insert(name, value);
        }

        Ok(store)
    }

    /// Insert a fixture programmatically (embedding callers and tests)
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fixtures.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> HarnessResult<&Value> {
        self.fixtures
            .get(name)
            .ok_or_else(|| HarnessError::Fixture(format!("fixture '{name}' is not loaded")))
    }

    /// Look up one record inside a fixture mapping
    pub fn record(&self, name: &str, key: &str) -> HarnessResult<Value> {
        let fixture = self.get(name)?;
        fixture.get(key).cloned().ok_or_else(|| {
            HarnessError::Fixture(format!("fixture '{name}' has no key '{key}'"))
        })
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}
