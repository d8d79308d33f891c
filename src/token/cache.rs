use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::token::TokenConfig;
use crate::errors::KitError;
use crate::helpers::time::{ms_to_datetime, now_ms};
use crate::http::HttpExecutor;
use crate::observability::metrics::METRICS;
use crate::token::generator::generate_token;
use crate::token::state::{TokenSnapshot, TokenState};

/// How long a caller waits for a refresh already in flight before using the
/// token it has.
pub const REFRESH_WAIT_MS: u64 = 100;

/// Per-worker token cache.
///
/// Within one process the refresh is guarded by a real mutex, so tasks sharing
/// a cache trigger a single regeneration. Caches in other processes refresh on
/// their own from their snapshot copy.
pub struct TokenCache<E> {
    executor: E,
    state: RwLock<Option<TokenState>>,
    refresh_lock: Mutex<()>,
}

impl<E: HttpExecutor + Send + Sync> TokenCache<E> {
    /// Empty cache; adopts the first snapshot passed to [`get_token`](Self::get_token).
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            state: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Validate `config`, generate the first token and return the cache with
    /// the snapshot to hand to every worker.
    pub async fn initialize(executor: E, config: TokenConfig) -> Result<(Self, TokenSnapshot), KitError> {
        let mut errors = Vec::new();
        config.validate(&mut errors);
        if !errors.is_empty() {
            return Err(KitError::Config(errors.join("; ")));
        }

        let generated_at_ms = now_ms();
        let token = generate_token(&executor, &config)
            .await
            .map_err(|err| KitError::Initialization(err.to_string()))?;

        let state = TokenState::new(token, generated_at_ms, config);
        info!(
            expires_at = ?ms_to_datetime(state.expires_at_ms()),
            refresh_at = ?ms_to_datetime(state.refresh_threshold_ms()),
            "token cache initialized"
        );

        let cache = Self::new(executor);
        *cache.state.write().await = Some(state.clone());
        Ok((cache, state))
    }

    /// Current token, regenerated once the refresh threshold has passed.
    ///
    /// Never fails: a failed refresh logs a warning and the stale token is
    /// returned.
    pub async fn get_token(&self, snapshot: &TokenSnapshot) -> String {
        self.get_token_at(snapshot, now_ms()).await
    }

    pub(crate) async fn get_token_at(&self, snapshot: &TokenSnapshot, now_ms: i64) -> String {
        let existing = self.state.read().await.clone();
        let current = match existing {
            Some(state) => state,
            None => self.adopt(snapshot).await,
        };

        if !current.needs_refresh(now_ms) {
            return current.token().to_owned();
        }

        match self.refresh_lock.try_lock() {
            Ok(_guard) => {
                // someone may have finished a refresh between our read and the lock
                if let Some(latest) = self.state.read().await.as_ref() {
                    if !latest.needs_refresh(now_ms) {
                        return latest.token().to_owned();
                    }
                }

                info!(
                    now_ms,
                    refresh_at_ms = current.refresh_threshold_ms(),
                    "token refresh threshold reached"
                );
                match self.regenerate(current.config(), now_ms).await {
                    Ok(token) => token,
                    Err(err) => {
                        warn!(error = %err, "token refresh failed, reusing stale token");
                        current.token().to_owned()
                    }
                }
            }
            Err(_) => {
                METRICS.token_refresh_skipped.inc();
                debug!("refresh already in flight, waiting briefly");
                let _ = tokio::time::timeout(
                    Duration::from_millis(REFRESH_WAIT_MS),
                    self.refresh_lock.lock(),
                )
                .await;
                self.state
                    .read()
                    .await
                    .as_ref()
                    .map(|state| state.token().to_owned())
                    .unwrap_or_else(|| current.token().to_owned())
            }
        }
    }

    /// Regenerate regardless of the threshold.
    pub async fn force_refresh(&self) -> Result<String, KitError> {
        let config = self
            .state
            .read()
            .await
            .as_ref()
            .map(|state| state.config().clone())
            .ok_or_else(|| {
                KitError::Generation("no token state; initialize or adopt a snapshot first".to_owned())
            })?;

        let _guard = self.refresh_lock.lock().await;
        info!("forced token refresh");
        self.regenerate(&config, now_ms()).await
    }

    /// Current local state for re-propagation
    pub async fn snapshot(&self) -> Option<TokenSnapshot> {
        self.state.read().await.clone()
    }

    /// First caller installs `snapshot`; racing callers get whatever won.
    async fn adopt(&self, snapshot: &TokenSnapshot) -> TokenState {
        self.state
            .write()
            .await
            .get_or_insert_with(|| {
                debug!("adopting token snapshot");
                snapshot.clone()
            })
            .clone()
    }

    /// Caller must hold `refresh_lock`.
    async fn regenerate(&self, config: &TokenConfig, generated_at_ms: i64) -> Result<String, KitError> {
        let token = generate_token(&self.executor, config).await?;
        let state = TokenState::new(token.clone(), generated_at_ms, config.clone());
        *self.state.write().await = Some(state);
        Ok(token)
    }
}
