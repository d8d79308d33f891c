use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, warn};

use crate::correlation::path::resolve_path;
use crate::errors::KitError;
use crate::helpers::text::{truncate, ERROR_BODY_MAX_CHARS};
use crate::http::HttpResponse;
use crate::observability::metrics::METRICS;

lazy_static::lazy_static! {
    static ref URL_PLACEHOLDER_RE: Regex = Regex::new(r"\{([a-zA-Z0-9_\.-]+)\}").unwrap();
}

/// Value extracted for one key
#[derive(Debug, Clone)]
pub struct CorrelationEntry {
    /// `None` when the path did not resolve
    pub value: Option<Value>,
    pub path: String,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub required: bool,
    /// returned instead of `None` when the path does not resolve
    pub fallback: Option<Value>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            required: true,
            fallback: None,
        }
    }
}

impl ExtractOptions {
    pub fn optional() -> Self {
        Self {
            required: false,
            fallback: None,
        }
    }
}

/// Run-scoped correlation values.
///
/// Callers clear the store at the start of every logical run; entries from a
/// previous run are otherwise still visible.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    entries: HashMap<String, CorrelationEntry>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `response` as JSON, resolve `path` and store the result under `key`.
    pub fn extract(
        &mut self,
        response: &HttpResponse,
        path: &str,
        key: &str,
        options: &ExtractOptions,
    ) -> Option<Value> {
        let value = match response.json() {
            Some(json) => resolve_path(&json, path).cloned(),
            None => {
                debug!(key, status = response.status, "response body is not valid JSON");
                None
            }
        };

        if value.is_none() {
            if options.required {
                METRICS.correlation_failures.with_label_values(&[key]).inc();
                error!(
                    key,
                    path,
                    status = response.status,
                    body = %truncate(&response.body, ERROR_BODY_MAX_CHARS),
                    "required correlation value not found"
                );
            } else {
                warn!(key, path, "optional correlation value not found");
            }
        } else {
            debug!(key, path, "correlation value extracted");
        }

        self.entries.insert(
            key.to_owned(),
            CorrelationEntry {
                value: value.clone(),
                path: path.to_owned(),
                extracted_at: Utc::now(),
            },
        );

        value.or_else(|| options.fallback.clone())
    }

    /// Stored value for `key`, or `fallback`
    pub fn get(&self, key: &str, fallback: Option<Value>) -> Option<Value> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value.clone())
            .or(fallback)
    }

    /// Stored value rendered as a string (strings unquoted)
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value.as_ref())
            .map(value_to_string)
    }

    pub fn entry(&self, key: &str) -> Option<&CorrelationEntry> {
        self.entries.get(key)
    }

    /// True iff a non-null value is stored under `key`
    pub fn exists(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map_or(false, |entry| entry.value.is_some())
    }

    /// Check that every key exists.
    ///
    /// Missing keys are logged; with `abort_on_missing` they become a
    /// run-abort error instead of `Ok(false)`.
    pub fn validate_required(&self, keys: &[&str], abort_on_missing: bool) -> Result<bool, KitError> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.exists(key))
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            return Ok(true);
        }

        error!(missing = ?missing, "required correlation values missing");
        if abort_on_missing {
            return Err(KitError::CorrelationMissing { missing });
        }
        Ok(false)
    }

    /// Substitute every `{placeholder}` in `template`.
    ///
    /// `mapping` is placeholder -> correlation key; without it each placeholder
    /// names its own key. Returns `None` when any key is missing rather than a
    /// partially rendered URL.
    pub fn build_url(&self, template: &str, mapping: Option<&HashMap<String, String>>) -> Option<String> {
        let key_for = |placeholder: &str| -> String {
            mapping
                .and_then(|m| m.get(placeholder))
                .cloned()
                .unwrap_or_else(|| placeholder.to_owned())
        };

        let missing: Vec<String> = URL_PLACEHOLDER_RE
            .captures_iter(template)
            .map(|caps| key_for(&caps[1]))
            .filter(|key| !self.exists(key))
            .collect();

        if !missing.is_empty() {
            error!(template, missing = ?missing, "cannot build url, correlation keys missing");
            return None;
        }

        let url = URL_PLACEHOLDER_RE.replace_all(template, |caps: &Captures| {
            self.get_str(&key_for(&caps[1])).unwrap_or_default()
        });
        Some(url.into_owned())
    }

    /// Apply [`extract`](Self::extract) for every `(key, path)` pair.
    ///
    /// The aggregate is returned even when some values are missing; the overall
    /// failure only shows up in the log.
    pub fn extract_multiple(
        &mut self,
        response: &HttpResponse,
        mappings: &[(&str, &str)],
        all_required: bool,
    ) -> HashMap<String, Option<Value>> {
        let options = ExtractOptions {
            required: all_required,
            fallback: None,
        };
        let results: HashMap<String, Option<Value>> = mappings
            .iter()
            .map(|(key, path)| (key.to_string(), self.extract(response, path, key, &options)))
            .collect();

        let failed: Vec<&String> = results
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key)
            .collect();
        if !failed.is_empty() && all_required {
            error!(failed = ?failed, "multi-extraction incomplete");
        }
        results
    }

    /// Drop every entry; call at the start of each logical run.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_owned(),
        other => other.to_string(),
    }
}
