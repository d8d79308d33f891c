use base64::Engine;
use http::Method;
use regex::{Captures, Regex};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::token::{CredentialsPlacement, TokenConfig};
use crate::correlation::path::resolve_path;
use crate::errors::KitError;
use crate::helpers::text::{truncate, TOKEN_BODY_MAX_CHARS};
use crate::helpers::time::get_instant;
use crate::http::{HttpExecutor, HttpRequest};
use crate::observability::metrics::{METRICS, OUTCOME_FAILURE, OUTCOME_SUCCESS};

pub const TEMPLATE_PLACEHOLDERS: [&str; 2] = ["username", "password"];

lazy_static::lazy_static! {
    static ref TEMPLATE_RE: Regex = Regex::new(r"\{\{\s*(username|password)\s*\}\}").unwrap();
}

const CONTENT_TYPE: &str = "content-type";
const AUTHORIZATION: &str = "authorization";

/// Issue one token request and pull the token out of the response.
///
/// Accepts status 200 or 201 with a non-null value at `token_path`; anything
/// else is a [`KitError::Generation`]. No retry happens here.
pub async fn generate_token<E: HttpExecutor>(executor: &E, config: &TokenConfig) -> Result<String, KitError> {
    let request = build_request(config)?;
    let start = get_instant();
    info!(url = %config.url, method = %config.method, "generating token");

    let result = executor.execute(request).await;
    METRICS.token_generation_duration.observe(start.elapsed().as_secs_f64());

    let outcome = match result {
        Ok(response) => {
            if response.status != 200 && response.status != 201 {
                warn!(
                    status = response.status,
                    body = %truncate(&response.body, TOKEN_BODY_MAX_CHARS),
                    "token endpoint returned unexpected status"
                );
                Err(KitError::Generation(format!("unexpected status {}", response.status)))
            } else {
                match response.json().as_ref().and_then(|json| resolve_path(json, &config.token_path)) {
                    Some(value) => Ok(token_to_string(value)),
                    None => {
                        warn!(
                            status = response.status,
                            token_path = %config.token_path,
                            body = %truncate(&response.body, TOKEN_BODY_MAX_CHARS),
                            "token not found in response"
                        );
                        Err(KitError::Generation(format!(
                            "token path '{}' did not resolve",
                            config.token_path
                        )))
                    }
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "token request failed");
            Err(KitError::Generation(err.to_string()))
        }
    };

    let label = if outcome.is_ok() { OUTCOME_SUCCESS } else { OUTCOME_FAILURE };
    METRICS.token_generation_requests.with_label_values(&[label]).inc();
    if outcome.is_ok() {
        debug!("token generated");
    }
    outcome
}

/// Request described by the token config, credentials resolved.
pub fn build_request(config: &TokenConfig) -> Result<HttpRequest, KitError> {
    let credentials = config
        .credentials
        .as_ref()
        .ok_or_else(|| KitError::Config("token.credentials are required".to_owned()))?;
    let username = credentials
        .username
        .resolve()
        .map_err(|err| KitError::Generation(err.to_string()))?;
    let password = credentials
        .password
        .resolve()
        .map_err(|err| KitError::Generation(err.to_string()))?;

    let mut request = HttpRequest::new(config.method.clone(), config.url.clone());
    if let Some(headers) = &config.headers {
        for (key, value) in headers {
            request = request.header(key.to_owned(), value.to_owned());
        }
    }

    if config.credentials_in == CredentialsPlacement::BasicAuth {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", username, password));
        request = request.header(AUTHORIZATION, format!("Basic {}", encoded));
    }

    let body = match &config.body_template {
        Some(template) => Some(render_body(template, &username, &password)),
        None if config.credentials_in == CredentialsPlacement::Body && method_has_body(&config.method) => {
            Some(json!({ "username": username, "password": password }).to_string())
        }
        None => None,
    };

    if let Some(body) = body {
        if !has_header(&request, CONTENT_TYPE) {
            request = request.header(CONTENT_TYPE, content_type_for(&body));
        }
        request = request.body(body);
    }
    Ok(request)
}

fn render_body(template: &str, username: &str, password: &str) -> String {
    TEMPLATE_RE
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "username" => username.to_owned(),
            _ => password.to_owned(),
        })
        .into_owned()
}

fn method_has_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

fn has_header(request: &HttpRequest, name: &str) -> bool {
    request
        .headers
        .iter()
        .any(|(key, _)| key.eq_ignore_ascii_case(name))
}

fn content_type_for(body: &str) -> &'static str {
    if serde_json::from_str::<Value>(body).is_ok() {
        "application/json"
    } else {
        "application/x-www-form-urlencoded"
    }
}

fn token_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_owned(),
        other => other.to_string(),
    }
}
