use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Status code carried by failures that never received a response.
pub const NETWORK_ERROR_CODE: u16 = 0;
/// Status code carried by client-side timeouts.
pub const CLIENT_TIMEOUT_CODE: u16 = 408;

/// Structured `{code, message}` failure returned by every public operation.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), body: None }
    }

    pub fn entity_not_found(entity_id: &str) -> Self {
        Self::new(404, format!("Entity {} not found", entity_id))
    }

    /// Builds a failure from a non-success response body.
    ///
    /// The server's `message` field wins over the canonical reason phrase.
    pub fn from_response(status: http::StatusCode, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| status.canonical_reason().map(str::to_owned))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Self { code: status.as_u16(), message, body }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Authentication failures. `Clone` so one refresh result can be shared by every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("login provider '{0}' is not enabled")]
    ProviderNotEnabled(String),
    #[error("credential provider does not support interactive sign-in")]
    NotInteractive,
    #[error("credential provider initialization failed: {0}")]
    Initialize(String),
    #[error("token refresh failed: {0}")]
    Refresh(String),
    #[error("sign-in failed: {0}")]
    SignIn(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match err {
            AuthError::Unauthenticated | AuthError::Refresh(_) | AuthError::SignIn(_) => 401,
            AuthError::ProviderNotEnabled(_) | AuthError::NotInteractive => 400,
            AuthError::Initialize(_) => 500,
        };
        ApiError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_message_wins_over_reason_phrase() {
        let err = ApiError::from_response(
            http::StatusCode::UNPROCESSABLE_ENTITY,
            Some(json!({"message": "name is required"})),
        );
        assert_eq!(err.code, 422);
        assert_eq!(err.message, "name is required");

        let err = ApiError::from_response(http::StatusCode::BAD_REQUEST, None);
        assert_eq!(err.message, "Bad Request");
    }

    #[test]
    fn entity_not_found_serializes_as_code_and_message() {
        let value = serde_json::to_value(ApiError::entity_not_found("order")).unwrap();
        assert_eq!(value, json!({"code": 404, "message": "Entity order not found"}));
    }
}
