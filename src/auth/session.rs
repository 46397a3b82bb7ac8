use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key under which the current access token is kept
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key under which the last sign-in failure message is kept
pub const LOGIN_FAILED_KEY: &str = "loginFailed";

/// Session-scoped credential storage: key -> value.
/// Lives only as long as the client that owns it.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .get(ACCESS_TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .cloned()
    }

    pub async fn set_access_token(&self, token: String) {
        self.inner.write().await.insert(ACCESS_TOKEN_KEY.to_owned(), token);
    }

    pub async fn clear_access_token(&self) {
        self.inner.write().await.remove(ACCESS_TOKEN_KEY);
    }

    pub async fn login_failed(&self) -> Option<String> {
        self.inner.read().await.get(LOGIN_FAILED_KEY).cloned()
    }

    /// Stores a successful sign-in and drops any earlier failure message.
    pub async fn record_sign_in(&self, token: String) {
        let mut map = self.inner.write().await;
        map.remove(LOGIN_FAILED_KEY);
        map.insert(ACCESS_TOKEN_KEY.to_owned(), token);
    }

    pub async fn record_sign_in_failure(&self, message: String) {
        self.inner.write().await.insert(LOGIN_FAILED_KEY.to_owned(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_clears_previous_failure() {
        let store = SessionStore::new();
        store.record_sign_in_failure("popup closed".into()).await;
        assert_eq!(store.login_failed().await.as_deref(), Some("popup closed"));

        store.record_sign_in("tok".into()).await;
        assert_eq!(store.login_failed().await, None);
        assert_eq!(store.access_token().await.as_deref(), Some("tok"));

        store.clear_access_token().await;
        assert_eq!(store.access_token().await, None);
    }

    #[tokio::test]
    async fn empty_token_reads_as_absent() {
        let store = SessionStore::new();
        store.set_access_token(String::new()).await;
        assert_eq!(store.access_token().await, None);
    }
}
