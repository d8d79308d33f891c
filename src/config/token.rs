use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{env, fs};

use anyhow::{anyhow, Error, Result};

pub const DEFAULT_TOKEN_PATH: &str = "access_token";
/// One year
pub const MAX_LIFETIME_SECONDS: u64 = 365 * 24 * 60 * 60;

/// ================================
/// Token endpoint
/// ================================
///
/// Immutable once the cache is initialized. Serializable because it travels
/// inside the token snapshot handed to every worker.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenConfig {
    pub url: String,
    #[serde(with = "http_serde::method", default = "default_method")]
    pub method: Method, // GET, POST
    pub credentials: Option<CredentialsConfig>,
    #[serde(default)]
    pub credentials_in: CredentialsPlacement,
    pub lifetime_seconds: u64,
    /// request body with `{{username}}` / `{{password}}` placeholders
    pub body_template: Option<String>,
    /// dot path of the token inside the JSON response, e.g. `data.tokens[0].value`
    #[serde(default = "default_token_path")]
    pub token_path: String,
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CredentialsConfig {
    pub username: SecretValue,
    pub password: SecretValue,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsPlacement {
    /// rendered into the request body
    #[default]
    Body,
    /// `Authorization: Basic` header
    BasicAuth,
}

/// Credential value sources
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum SecretValue {
    Literal { value: String },
    FromEnv { from_env: String },
    FromFile { path: String },
}

impl SecretValue {
    pub fn literal(value: impl Into<String>) -> Self {
        SecretValue::Literal {
            value: value.into(),
        }
    }

    pub fn resolve(&self) -> Result<String, Error> {
        match self {
            SecretValue::Literal { value } => Ok(value.to_owned()),
            SecretValue::FromEnv { from_env } => env::var(from_env)
                .map_err(|err| anyhow!("env var '{}' unavailable: {}", from_env, err)),
            SecretValue::FromFile { path } => fs::read_to_string(path)
                .map(|res| res.trim().to_string())
                .map_err(|err| anyhow!("secret file '{}' unreadable: {}", path, err)),
        }
    }
}

impl TokenConfig {
    /// Aggregates every problem instead of stopping at the first one.
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.url.trim().is_empty() {
            errors.push("token.url must not be empty".to_owned());
        }
        match &self.credentials {
            None => errors.push("token.credentials are required".to_owned()),
            Some(credentials) => {
                for (name, secret) in [
                    ("username", &credentials.username),
                    ("password", &credentials.password),
                ] {
                    match secret.resolve() {
                        Ok(value) if value.is_empty() => {
                            errors.push(format!("token.credentials.{} is empty", name))
                        }
                        Ok(_) => {}
                        Err(err) => errors.push(format!("token.credentials.{}: {}", name, err)),
                    }
                }
            }
        }
        if self.lifetime_seconds == 0 {
            errors.push("token.lifetime_seconds must be > 0".to_owned());
        } else if self.lifetime_seconds > MAX_LIFETIME_SECONDS {
            errors.push(format!(
                "token.lifetime_seconds {} exceeds the maximum of {}",
                self.lifetime_seconds, MAX_LIFETIME_SECONDS
            ));
        }
        if self.token_path.trim().is_empty() {
            errors.push("token.token_path must not be empty".to_owned());
        }
    }
}

fn default_method() -> Method {
    Method::POST
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_owned()
}
