/// Retrying transport
///
/// Every attempt re-resolves the access token, so a 401 followed by a retry
/// picks up a token the lifecycle manager refreshed in the meantime.
use std::fmt;
use std::sync::Arc;

use http::{Method, StatusCode};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::lifecycle::TokenManager;
use crate::error::{ApiError, ApiResult, CLIENT_TIMEOUT_CODE, NETWORK_ERROR_CODE};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;

/// Statuses worth another attempt. 401 retries re-resolve the token.
pub const RETRYABLE_STATUS: [u16; 4] = [401, 502, 503, 522];

/// Outcome of one failed attempt
#[derive(Debug)]
pub enum AttemptError {
    /// no response was received
    Send(reqwest::Error),
    /// a non-success response was received
    Status { status: StatusCode, body: Option<Value> },
    /// the response arrived but its body could not be read
    Body { status: StatusCode, source: reqwest::Error },
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Send(e) => write!(f, "request failed: {}", e),
            AttemptError::Status { status, .. } => write!(f, "server responded {}", status),
            AttemptError::Body { status, source } => {
                write!(f, "reading {} response failed: {}", status, source)
            }
        }
    }
}

impl AttemptError {
    fn outcome(&self) -> String {
        match self {
            AttemptError::Send(e) if e.is_timeout() => "timeout".to_owned(),
            AttemptError::Send(_) => "network".to_owned(),
            AttemptError::Status { status, .. } | AttemptError::Body { status, .. } => {
                status.as_u16().to_string()
            }
        }
    }
}

/// Network failures retry unless the client gave up on them; responses retry by status.
pub fn is_retryable(err: &AttemptError) -> bool {
    match err {
        AttemptError::Send(e) => !e.is_timeout() && !e.is_builder(),
        AttemptError::Status { status, .. } => RETRYABLE_STATUS.contains(&status.as_u16()),
        AttemptError::Body { .. } => false,
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Send(e) if e.is_timeout() => {
                ApiError::new(CLIENT_TIMEOUT_CODE, format!("request timed out: {}", e))
            }
            AttemptError::Send(e) => ApiError::new(NETWORK_ERROR_CODE, format!("request failed: {}", e)),
            AttemptError::Status { status, body } => ApiError::from_response(status, body),
            AttemptError::Body { status, source } => ApiError::new(
                status.as_u16(),
                format!("failed to read response body: {}", source),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    retry: RetrySettings,
}

impl Transport {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: Arc<TokenManager>, retry: RetrySettings) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url, tokens, retry }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send(Method::GET, path, None::<&()>, None).await
    }

    pub async fn get_with_query<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> ApiResult<Value> {
        self.send(Method::GET, path, Some(query), None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.send(Method::POST, path, None::<&()>, Some(to_body(body)?)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.send(Method::PUT, path, None::<&()>, Some(to_body(body)?)).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.send(Method::PATCH, path, None::<&()>, Some(to_body(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send(Method::DELETE, path, None::<&()>, None).await
    }

    async fn send<Q: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let start = get_instant();
        let result = self
            .retry
            .run_with_retry(|| self.attempt(&method, &url, query, body.as_ref()), is_retryable)
            .await;
        get_metrics()
            .await
            .http_request_duration
            .with_label_values(&[method.as_str()])
            .observe(start.elapsed().as_secs_f64());
        result.map_err(ApiError::from)
    }

    async fn attempt<Q: Serialize + ?Sized>(
        &self,
        method: &Method,
        url: &str,
        query: Option<&Q>,
        body: Option<&Value>,
    ) -> Result<Value, AttemptError> {
        let mut request = self.client.request(method.clone(), url);
        match self.tokens.access_token().await {
            Ok(token) => request = request.bearer_auth(token),
            // the server decides; its 401 feeds the retry policy
            Err(e) => warn!(error = %e, "dispatching without bearer token"),
        }
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, url, "dispatching request");
        let result = dispatch(request).await;
        let outcome = match &result {
            Ok(_) => "ok".to_owned(),
            Err(e) => e.outcome(),
        };
        get_metrics()
            .await
            .http_requests
            .with_label_values(&[method.as_str(), outcome.as_str()])
            .inc();
        result
    }
}

async fn dispatch(request: reqwest::RequestBuilder) -> Result<Value, AttemptError> {
    let response = request.send().await.map_err(AttemptError::Send)?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| AttemptError::Body { status, source })?;
    let body = decode_body(&text);

    if status.is_success() {
        Ok(body)
    } else {
        Err(AttemptError::Status {
            status,
            body: (!body.is_null()).then_some(body),
        })
    }
}

/// Empty bodies decode to `null`, non-JSON bodies to a JSON string.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::new(400, format!("invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bodies_decode_leniently() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("{\"id\":1}"), json!({"id": 1}));
        assert_eq!(decode_body("plain text"), json!("plain text"));
    }

    #[test]
    fn retryable_statuses() {
        for code in [401, 502, 503, 522] {
            let err = AttemptError::Status { status: StatusCode::from_u16(code).unwrap(), body: None };
            assert!(is_retryable(&err), "{code} should be retryable");
        }
        for code in [400, 403, 404, 409, 422, 500] {
            let err = AttemptError::Status { status: StatusCode::from_u16(code).unwrap(), body: None };
            assert!(!is_retryable(&err), "{code} should be terminal");
        }
    }
}
