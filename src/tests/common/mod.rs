// shared helpers for the scenario tests
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::token::{CredentialsConfig, CredentialsPlacement, SecretValue, TokenConfig};
use crate::http::{HttpExecutor, HttpRequest, HttpResponse};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn token_config(url: &str, lifetime_seconds: u64) -> TokenConfig {
    TokenConfig {
        url: url.to_owned(),
        method: http::Method::POST,
        credentials: Some(CredentialsConfig {
            username: SecretValue::literal("svc"),
            password: SecretValue::literal("pw"),
        }),
        credentials_in: CredentialsPlacement::Body,
        lifetime_seconds,
        body_template: None,
        token_path: "access_token".to_owned(),
        headers: None,
    }
}

/// In-process token endpoint issuing `tok-1`, `tok-2`, ... per call
#[derive(Clone, Default)]
pub struct StubTokenEndpoint {
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    delay_ms: u64,
}

impl StubTokenEndpoint {
    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl HttpExecutor for StubTokenEndpoint {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Ok(HttpResponse::new(503, "token service unavailable"));
        }
        Ok(HttpResponse::new(200, json!({ "access_token": format!("tok-{}", n) }).to_string()))
    }
}
