use std::collections::BTreeMap;

use serde::Serialize;

/// Placeholder values bound into a contract template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderContext {
    values: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Insert the value uppercased.
    pub fn insert_upper(&mut self, key: impl Into<String>, value: &str) {
        self.values.insert(key.into(), value.to_uppercase());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}
