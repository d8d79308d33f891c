pub mod datasets;
pub mod loader;
pub mod settings;
pub mod token;
pub mod validator;

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::datasets::{AllocationOptions, DatasetConfig};
use crate::config::settings::{HttpSettings, LoggingConfig};
use crate::config::token::TokenConfig;

/// ================================
/// Full kit configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct KitConfig {
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub http: HttpSettings,
    pub token: Option<TokenConfig>,
    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetConfig>,
    #[serde(default)]
    pub allocation: AllocationOptions,
}
