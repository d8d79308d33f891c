use std::{fs, path::Path};

use tracing::{debug, error};

use crate::config::settings::LoggingConfig;
use crate::config::validator;
use crate::config::KitConfig;
use crate::errors::KitError;
use crate::observability::metrics::METRICS;

/// Load and validate config from YAML file
pub fn file_to_config(path: &Path) -> Result<KitConfig, KitError> {
    let content = fs::read_to_string(path).map_err(|err| {
        KitError::Config(format!("cannot read config '{}': {}", path.display(), err))
    })?;
    parse_config(&content)
}

/// Parse, apply defaults and validate
pub fn parse_config(content: &str) -> Result<KitConfig, KitError> {
    let kit_config = parse_config_unchecked(content)?;
    debug!("validation config ...");
    validator::validate_kit_config(&kit_config).map_err(|errors| {
        KitError::Config(format!(
            "config is not valid, total errors: {}\n{}",
            errors.len(),
            errors.join("\n")
        ))
    })?;
    Ok(kit_config)
}

pub(crate) fn parse_config_unchecked(content: &str) -> Result<KitConfig, KitError> {
    let mut kit_config: KitConfig = serde_yaml::from_str(content).inspect_err(|e| {
        error!("parse config error: {}", e);
        METRICS.config_validation_errors.inc();
    })?;

    // Apply defaults
    if kit_config.logging.is_none() {
        kit_config.logging = Some(LoggingConfig::default());
    }
    Ok(kit_config)
}
