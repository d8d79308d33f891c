//! Kit configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks token endpoint, credential resolution and body template placeholders
//! - Checks dataset sources, delimiters and the allocation bound
//! - Checks logging level

use regex::Regex;
use tracing::{error, info};

use crate::config::datasets::{AllocationOptions, DatasetConfig};
use crate::config::settings::{LoggingConfig, LOG_LEVELS};
use crate::config::token::TokenConfig;
use crate::config::KitConfig;
use crate::observability::metrics::METRICS;
use crate::token::generator::TEMPLATE_PLACEHOLDERS;

lazy_static::lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{\{\s*([a-zA-Z0-9_\.:-]+)\s*\}\}").unwrap();
}

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_kit_config(cfg: &KitConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    if let Some(logging) = &cfg.logging {
        validate_logging(logging, &mut errors);
    }
    if let Some(token) = &cfg.token {
        validate_token(token, &mut errors);
    }
    for (name, dataset) in &cfg.datasets {
        validate_dataset(name, dataset, &mut errors);
    }
    validate_allocation(&cfg.allocation, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        METRICS.config_validation_errors.inc();
        Err(errors)
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' must be one of {}",
            logging.level,
            LOG_LEVELS.join(", ")
        ));
    }
}

/// TOKEN VALIDATION
pub fn validate_token(token: &TokenConfig, errors: &mut Vec<String>) {
    token.validate(errors);

    if let Some(template) = &token.body_template {
        validate_template_placeholders(template, errors);
    }
    if let Some(headers) = &token.headers {
        for key in headers.keys() {
            if http::HeaderName::from_bytes(key.as_bytes()).is_err() {
                errors.push(format!("token.headers: '{}' is not a valid header name", key));
            }
        }
    }
}

/// Only `{{username}}` and `{{password}}` may appear in a body template.
fn validate_template_placeholders(template: &str, errors: &mut Vec<String>) {
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        if let Some(tok) = caps.get(1) {
            let content = tok.as_str();
            if !TEMPLATE_PLACEHOLDERS.contains(&content) {
                errors.push(format!(
                    "token.body_template contains unknown placeholder '{{{{{}}}}}', expected one of {}",
                    content,
                    TEMPLATE_PLACEHOLDERS.join(", ")
                ));
            }
        }
    }
}

/// DATASET VALIDATION
fn validate_dataset(name: &str, dataset: &DatasetConfig, errors: &mut Vec<String>) {
    if dataset.path.trim().is_empty() {
        errors.push(format!("datasets['{}'].path must not be empty", name));
    }
    if !dataset.options.delimiter.is_ascii() {
        errors.push(format!(
            "datasets['{}'].delimiter '{}' must be a single ASCII character",
            name, dataset.options.delimiter
        ));
    }
}

fn validate_allocation(allocation: &AllocationOptions, errors: &mut Vec<String>) {
    if allocation.max_rows_per_worker == 0 {
        errors.push("allocation.max_rows_per_worker must be > 0".to_owned());
    }
}
