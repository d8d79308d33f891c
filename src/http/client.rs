use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Error, Result};
use reqwest::Client;
use tracing::debug;

use crate::helpers::time::get_instant;
use crate::http::types::{HttpRequest, HttpResponse};

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

/// Transport used by the token cache to talk to the auth endpoint.
///
/// Non-2xx statuses are not errors here; `Err` means the exchange itself failed.
pub trait HttpExecutor {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(timeout_ms: Option<u64>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(
                timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
            ))
            .build()
            .map_err(|err| anyhow!("failed to build http client: {}", err))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, Error> {
        let start = get_instant();
        let mut request = self.client.request(req.method.clone(), &req.url);

        for (key, value) in &req.headers {
            request = request.header(key, value);
        }
        if let Some(body) = req.body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let timing_ms = start.elapsed().as_millis() as u64;
        debug!(method = %req.method, url = %req.url, status, timing_ms, "http exchange finished");

        Ok(HttpResponse {
            status,
            body,
            timing_ms,
        })
    }
}
