//! Step parameter types

use crate::errors::CapabilityError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capability-specific parameters of a plan step (e.g. `url`, `x_column`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepParams {
    values: BTreeMap<String, serde_json::Value>,
}

impl StepParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Insert a parameter, returning the previous value if any
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// True when the key holds something other than `null` or a blank string
    pub fn is_present(&self, key: &str) -> bool {
        match self.values.get(key) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.values.iter()
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Result<String, CapabilityError> {
        self.param_str_opt(key)
            .ok_or_else(|| CapabilityError::MissingParameter(key.to_string()))
    }

    /// Get an optional string parameter. Blank strings count as absent.
    pub fn param_str_opt(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// Get an optional bool parameter. Accepts `true`/`false` and their string forms.
    pub fn param_bool_opt(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get a parameter as a JSON value
    pub fn param_json(&self, key: &str) -> Result<&serde_json::Value, CapabilityError> {
        self.values
            .get(key)
            .ok_or_else(|| CapabilityError::MissingParameter(key.to_string()))
    }
}

impl FromIterator<(String, serde_json::Value)> for StepParams {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
