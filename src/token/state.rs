use serde::{Deserialize, Serialize};

use crate::config::token::TokenConfig;
use crate::errors::KitError;

/// Fraction of the lifetime after which a token is regenerated
pub const REFRESH_RATIO: f64 = 0.8;

/// Token with the timestamps it was generated at and expires at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenState {
    token: String,
    generated_at_ms: i64,
    expires_at_ms: i64,
    config: TokenConfig,
}

/// Serializable hand-off of a worker's token state
pub type TokenSnapshot = TokenState;

impl TokenState {
    /// `expires_at` is always derived from `generated_at` and the lifetime.
    pub fn new(token: String, generated_at_ms: i64, config: TokenConfig) -> Self {
        let expires_at_ms = generated_at_ms.saturating_add(lifetime_ms(&config));
        Self {
            token,
            generated_at_ms,
            expires_at_ms,
            config,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn generated_at_ms(&self) -> i64 {
        self.generated_at_ms
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.expires_at_ms
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn refresh_threshold_ms(&self) -> i64 {
        self.generated_at_ms
            .saturating_add((lifetime_ms(&self.config) as f64 * REFRESH_RATIO) as i64)
    }

    pub fn needs_refresh(&self, now_ms: i64) -> bool {
        now_ms >= self.refresh_threshold_ms()
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }

    pub fn to_json(&self) -> Result<String, KitError> {
        serde_json::to_string(self)
            .map_err(|err| KitError::Config(format!("token snapshot not serializable: {}", err)))
    }

    /// Parse a snapshot, re-deriving the expiry from its generation time.
    pub fn from_json(raw: &str) -> Result<Self, KitError> {
        let state: TokenState = serde_json::from_str(raw)
            .map_err(|err| KitError::Config(format!("invalid token snapshot: {}", err)))?;
        Ok(TokenState::new(state.token, state.generated_at_ms, state.config))
    }
}

fn lifetime_ms(config: &TokenConfig) -> i64 {
    i64::try_from(config.lifetime_seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::token::{CredentialsConfig, CredentialsPlacement, SecretValue};

    fn config(lifetime_seconds: u64) -> TokenConfig {
        TokenConfig {
            url: "http://auth.local/token".into(),
            method: http::Method::POST,
            credentials: Some(CredentialsConfig {
                username: SecretValue::literal("svc"),
                password: SecretValue::literal("pw"),
            }),
            credentials_in: CredentialsPlacement::Body,
            lifetime_seconds,
            body_template: None,
            token_path: "access_token".into(),
            headers: None,
        }
    }

    #[test]
    fn expiry_and_threshold_follow_lifetime() {
        let state = TokenState::new("t".into(), 10_000, config(100));
        assert_eq!(state.expires_at_ms(), 110_000);
        assert_eq!(state.refresh_threshold_ms(), 90_000);
        assert!(!state.needs_refresh(89_999));
        assert!(state.needs_refresh(90_000));
        assert!(!state.is_expired(109_999));
        assert!(state.is_expired(110_000));
    }

    #[test]
    fn huge_lifetime_saturates_instead_of_wrapping() {
        for lifetime in [u64::MAX, i64::MAX as u64, i64::MAX as u64 / 1000 + 1] {
            let state = TokenState::new("t".into(), 1_700_000_000_000, config(lifetime));
            assert_eq!(state.expires_at_ms(), i64::MAX);
            assert!(state.refresh_threshold_ms() > state.generated_at_ms());
            assert!(!state.needs_refresh(state.generated_at_ms()));
            assert!(!state.is_expired(state.generated_at_ms()));
        }
    }

    #[test]
    fn snapshot_survives_json_hand_off() {
        let state = TokenState::new("abc".into(), 1_700_000_000_000, config(60));
        let restored = TokenState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(restored.token(), "abc");
        assert_eq!(restored.generated_at_ms(), state.generated_at_ms());
        assert_eq!(restored.expires_at_ms(), state.expires_at_ms());
        assert_eq!(restored.config().method, http::Method::POST);
    }
}
