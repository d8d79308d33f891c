use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::correlation::path::resolve_path;
use crate::http::HttpResponse;
use crate::observability::metrics::{METRICS, RESULT_FAIL, RESULT_PASS};

/// JSON type a schema field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

type Predicate = Box<dyn Fn(&HttpResponse) -> bool + Send + Sync>;

/// Caller supplied named predicate
pub struct CustomCheck {
    pub name: String,
    predicate: Predicate,
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCheck").field("name", &self.name).finish()
    }
}

/// What a response is expected to look like
#[derive(Debug, Default)]
pub struct ValidationConfig {
    pub api_name: String,
    pub expected_status: Option<u16>,
    pub expected_statuses: Option<Vec<u16>>,
    /// recorded, never fails the overall result
    pub max_response_time_ms: Option<u64>,
    pub body_not_empty: bool,
    pub body_contains: Vec<String>,
    pub body_not_contains: Vec<String>,
    pub expect_json: bool,
    /// dot path -> expected type; each field must be present and non-null
    pub json_schema: BTreeMap<String, FieldType>,
    pub custom: Vec<CustomCheck>,
}

impl ValidationConfig {
    pub fn new(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn status_in(mut self, statuses: &[u16]) -> Self {
        self.expected_statuses = Some(statuses.to_vec());
        self
    }

    pub fn max_response_time_ms(mut self, max_ms: u64) -> Self {
        self.max_response_time_ms = Some(max_ms);
        self
    }

    pub fn body_not_empty(mut self) -> Self {
        self.body_not_empty = true;
        self
    }

    pub fn contains(mut self, needle: impl Into<String>) -> Self {
        self.body_contains.push(needle.into());
        self
    }

    pub fn not_contains(mut self, needle: impl Into<String>) -> Self {
        self.body_not_contains.push(needle.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.expect_json = true;
        self
    }

    pub fn field(mut self, path: impl Into<String>, field_type: FieldType) -> Self {
        self.json_schema.insert(path.into(), field_type);
        self
    }

    pub fn custom<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&HttpResponse) -> bool + Send + Sync + 'static,
    {
        self.custom.push(CustomCheck {
            name: name.into(),
            predicate: Box::new(predicate),
        });
        self
    }
}

/// Outcome of one named predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    /// excluded from the overall result
    pub observational: bool,
}

impl CheckResult {
    fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
            observational: false,
        }
    }

    fn observational(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
            observational: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub api: String,
    pub status: u16,
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    /// Conjunction of every non-observational check
    pub fn passed(&self) -> bool {
        self.checks
            .iter()
            .filter(|check| !check.observational)
            .all(|check| check.passed)
    }

    pub fn failed_checks(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|check| !check.passed && !check.observational)
            .map(|check| check.name.clone())
            .collect()
    }
}

/// Run every configured check, record metrics and return the conjunction.
pub fn validate(response: &HttpResponse, config: &ValidationConfig) -> bool {
    evaluate(response, config).passed()
}

/// Like [`validate`] but keeps each check's result.
pub fn evaluate(response: &HttpResponse, config: &ValidationConfig) -> ValidationReport {
    let mut checks = Vec::new();

    if let Some(expected) = config.expected_status {
        checks.push(status_check(response, expected));
    }
    if let Some(expected) = &config.expected_statuses {
        checks.push(status_in_check(response, expected));
    }
    if let Some(max_ms) = config.max_response_time_ms {
        let check = response_time_check(response, max_ms);
        checks.push(CheckResult::observational(check.name, check.passed));
    }
    if config.body_not_empty {
        checks.push(CheckResult::new("body not empty", !response.body.trim().is_empty()));
    }
    for needle in &config.body_contains {
        checks.push(CheckResult::new(
            format!("body contains '{}'", needle),
            response.body.contains(needle.as_str()),
        ));
    }
    for needle in &config.body_not_contains {
        checks.push(CheckResult::new(
            format!("body does not contain '{}'", needle),
            !response.body.contains(needle.as_str()),
        ));
    }

    let json = response.json();
    if config.expect_json {
        checks.push(CheckResult::new("body is valid JSON", json.is_some()));
    }
    for (path, field_type) in &config.json_schema {
        checks.push(schema_field_check(json.as_ref(), path, *field_type));
    }
    for custom in &config.custom {
        checks.push(CheckResult::new(custom.name.clone(), (custom.predicate)(response)));
    }

    let report = ValidationReport {
        api: config.api_name.clone(),
        status: response.status,
        checks,
    };
    record(&report.api, response, &report.checks);

    if !report.passed() {
        warn!(
            api = %report.api,
            status = response.status,
            failed = ?report.failed_checks(),
            "response validation failed"
        );
    }
    report
}

pub fn validate_status(response: &HttpResponse, expected: u16, api: &str) -> bool {
    let check = status_check(response, expected);
    record(api, response, std::slice::from_ref(&check));
    check.passed
}

pub fn validate_status_in(response: &HttpResponse, expected: &[u16], api: &str) -> bool {
    let check = status_in_check(response, expected);
    record(api, response, std::slice::from_ref(&check));
    check.passed
}

/// Presence (non-null) of every dot-path field in the JSON body
pub fn validate_fields(response: &HttpResponse, fields: &[&str], api: &str) -> bool {
    let json = response.json();
    let checks: Vec<CheckResult> = fields
        .iter()
        .map(|field| {
            let present = json
                .as_ref()
                .and_then(|json| resolve_path(json, field))
                .is_some();
            CheckResult::new(format!("field '{}' present", field), present)
        })
        .collect();
    record(api, response, &checks);
    checks.iter().all(|check| check.passed)
}

pub fn validate_response_time(response: &HttpResponse, max_ms: u64, api: &str) -> bool {
    let check = response_time_check(response, max_ms);
    record(api, response, std::slice::from_ref(&check));
    check.passed
}

fn status_check(response: &HttpResponse, expected: u16) -> CheckResult {
    CheckResult::new(format!("status is {}", expected), response.status == expected)
}

fn status_in_check(response: &HttpResponse, expected: &[u16]) -> CheckResult {
    CheckResult::new(
        format!("status in {:?}", expected),
        expected.contains(&response.status),
    )
}

fn response_time_check(response: &HttpResponse, max_ms: u64) -> CheckResult {
    CheckResult::new(
        format!("response time < {}ms", max_ms),
        response.timing_ms < max_ms,
    )
}

fn schema_field_check(json: Option<&Value>, path: &str, field_type: FieldType) -> CheckResult {
    let passed = json
        .and_then(|json| resolve_path(json, path))
        .map_or(false, |value| field_type.matches(value));
    CheckResult::new(format!("field '{}' is {}", path, field_type.as_str()), passed)
}

/// Tag each check with the api name and count responses outside 2xx.
fn record(api: &str, response: &HttpResponse, checks: &[CheckResult]) {
    for check in checks {
        let result = if check.passed { RESULT_PASS } else { RESULT_FAIL };
        METRICS
            .checks
            .with_label_values(&[api, check.name.as_str(), result])
            .inc();
    }

    METRICS.responses.with_label_values(&[api]).inc();
    if !response.is_success() {
        METRICS.business_errors.with_label_values(&[api]).inc();
        debug!(api, status = response.status, "business error recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business_errors(api: &str) -> u64 {
        METRICS.business_errors.with_label_values(&[api]).get()
    }

    #[test]
    fn created_response_passes_schema() {
        let api = "validator_created_case";
        let config = ValidationConfig::new(api)
            .status(201)
            .field("id", FieldType::String);

        let ok = HttpResponse::new(201, r#"{"id":"u1"}"#);
        assert!(validate(&ok, &config));
        assert_eq!(business_errors(api), 0);

        let failed = HttpResponse::new(500, r#"{"id":"u1"}"#);
        assert!(!validate(&failed, &config));
        assert_eq!(business_errors(api), 1);
        assert_eq!(METRICS.responses.with_label_values(&[api]).get(), 2);
    }

    #[test]
    fn response_time_is_observational() {
        let api = "validator_timing_case";
        let config = ValidationConfig::new(api).status(200).max_response_time_ms(100);
        let slow = HttpResponse::new(200, "{}").with_timing(2500);

        let report = evaluate(&slow, &config);
        assert!(report.passed());
        let timing = report.checks.iter().find(|c| c.name == "response time < 100ms").unwrap();
        assert!(!timing.passed);
        assert!(timing.observational);
        assert_eq!(
            METRICS
                .checks
                .with_label_values(&[api, "response time < 100ms", RESULT_FAIL])
                .get(),
            1
        );
    }

    #[test]
    fn body_and_schema_checks_are_combined() {
        let api = "validator_body_case";
        let config = ValidationConfig::new(api)
            .status_in(&[200, 204])
            .body_not_empty()
            .contains("orders")
            .not_contains("error")
            .json()
            .field("orders", FieldType::Array)
            .field("meta.count", FieldType::Number)
            .field("meta.next", FieldType::Object);

        let resp = HttpResponse::new(200, r#"{"orders":[1],"meta":{"count":1,"next":null}}"#);
        let report = evaluate(&resp, &config);
        assert!(!report.passed());
        assert_eq!(report.failed_checks(), vec!["field 'meta.next' is object"]);
    }

    #[test]
    fn non_json_body_fails_json_checks() {
        let api = "validator_html_case";
        let config = ValidationConfig::new(api).json().field("id", FieldType::String);
        let report = evaluate(&HttpResponse::new(200, "<html></html>"), &config);
        assert_eq!(report.failed_checks().len(), 2);
    }

    #[test]
    fn custom_predicates_take_part() {
        let api = "validator_custom_case";
        let config = ValidationConfig::new(api)
            .status(200)
            .custom("has three items", |r| {
                r.json()
                    .and_then(|v| v["items"].as_array().map(|a| a.len() == 3))
                    .unwrap_or(false)
            });
        assert!(validate(&HttpResponse::new(200, r#"{"items":[1,2,3]}"#), &config));
        assert!(!validate(&HttpResponse::new(200, r#"{"items":[1]}"#), &config));
    }

    #[test]
    fn narrow_variants_tag_and_count() {
        let api = "validator_narrow_case";
        let resp = HttpResponse::new(404, r#"{"error":"missing"}"#).with_timing(20);
        assert!(!validate_status(&resp, 200, api));
        assert!(validate_status_in(&resp, &[200, 404], api));
        assert!(validate_fields(&resp, &["error"], api));
        assert!(!validate_fields(&resp, &["error", "id"], api));
        assert!(validate_response_time(&resp, 50, api));
        assert_eq!(business_errors(api), 5);
        assert_eq!(
            METRICS.checks.with_label_values(&[api, "status is 200", RESULT_FAIL]).get(),
            1
        );
    }
}
