//! # Configuration Parameter Values
//!
//! Flat key/value configuration snapshot handed to processor handlers.
//!
//! Values come from three layers with a fixed precedence:
//! request-level override > job-scoped configuration > processor default.
//! The snapshot is taken once per job and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Layer a configuration value was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    ProcessorDefault,
    Job,
    Request,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationParameterValue {
    pub key: String,
    pub value: String,
    pub source: ParameterSource,
}

/// Resolved configuration snapshot for one job or one scheduling request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationParameterValueMap {
    values: BTreeMap<String, ConfigurationParameterValue>,
}

impl ConfigurationParameterValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from the three configuration layers.
    pub fn layered<'a, D, J, R>(processor_defaults: D, job_values: J, request_overrides: R) -> Self
    where
        D: IntoIterator<Item = (&'a String, &'a String)>,
        J: IntoIterator<Item = (&'a String, &'a String)>,
        R: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut map = Self::new();
        for (key, value) in processor_defaults {
            map.set(key, value, ParameterSource::ProcessorDefault);
        }
        for (key, value) in job_values {
            map.set(key, value, ParameterSource::Job);
        }
        for (key, value) in request_overrides {
            map.set(key, value, ParameterSource::Request);
        }
        map
    }

    /// Set a value unless a higher-precedence layer already provided one.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        source: ParameterSource,
    ) {
        let key = key.into();
        if let Some(existing) = self.values.get(&key) {
            if existing.source > source {
                return;
            }
        }
        self.values.insert(
            key.clone(),
            ConfigurationParameterValue {
                key,
                value: value.into(),
                source,
            },
        );
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, value, ParameterSource::Request);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.value.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Value that is present and not blank
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn source(&self, key: &str) -> Option<ParameterSource> {
        self.values.get(key).map(|v| v.source)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Integer value; `None` when absent or not a number
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse::<i64>().ok())
    }

    /// Boolean value: integers are true when non-zero, `true`/`false` are accepted
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(parse_flag)
    }

    pub fn flag_or(&self, key: &str, default: bool) -> bool {
        self.flag(key).unwrap_or(default)
    }

    /// Snapshot restricted to keys starting with `prefix`
    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigurationParameterValueMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.set(key, value, ParameterSource::Job);
        }
        map
    }
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if let Ok(number) = value.parse::<i64>() {
        return Some(number != 0);
    }
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}
