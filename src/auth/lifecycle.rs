/// Token lifecycle manager
///
/// Single owner of the session's access token. Decides staleness from the
/// token's `exp` claim and funnels concurrent refreshes into one in-flight
/// operation whose result every waiter shares.
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::portal::LoginProvider;
use crate::auth::provider::CredentialProvider;
use crate::auth::session::SessionStore;
use crate::error::AuthError;
use crate::observability::metrics::get_metrics;

type RefreshFuture = Shared<BoxFuture<'static, Result<String, AuthError>>>;

pub struct TokenManager {
    provider: Arc<CredentialProvider>,
    session: SessionStore,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("provider", &self.provider)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(provider: CredentialProvider, session: SessionStore) -> Self {
        Self {
            provider: Arc::new(provider),
            session,
            in_flight: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &CredentialProvider {
        &self.provider
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// One-time setup. Non-interactive providers also seed the session with a first token.
    pub async fn initialize(&self) -> Result<(), AuthError> {
        self.provider.initialize().await?;
        if let CredentialProvider::NonInteractive(_) = self.provider.as_ref() {
            self.refresh().await?;
        }
        info!(provider = self.provider.kind(), "credential provider initialized");
        Ok(())
    }

    pub fn is_token_expired(&self, token: &str) -> bool {
        self.provider.is_token_expired(token)
    }

    /// Returns a token that is valid now, awaiting a refresh when the cached one is stale.
    ///
    /// An empty session is not refreshed: after a failed refresh clears it,
    /// callers get `Unauthenticated` until `initialize` or `login` runs again.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let token = self.session.access_token().await.ok_or_else(|| {
            debug!("no access token in session");
            AuthError::Unauthenticated
        })?;
        if !self.provider.is_token_expired(&token) {
            return Ok(token);
        }
        debug!("access token expired, refreshing");
        self.refresh_replacing(Some(&token)).await
    }

    /// Joins the in-flight refresh or starts one.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        self.refresh_replacing(None).await
    }

    /// Refresh on behalf of a caller that saw `stale` in the session. If the
    /// session changed since, a refresh already settled and its outcome is returned.
    async fn refresh_replacing(&self, stale: Option<&str>) -> Result<String, AuthError> {
        let pending = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) if pending.peek().is_none() => pending.clone(),
                _ => {
                    let current = self.session.access_token().await;
                    if stale.is_some() && current.as_deref() != stale {
                        debug!("session changed while waiting, skipping refresh");
                        return current.ok_or(AuthError::Unauthenticated);
                    }
                    if let Some(token) = current {
                        if !self.provider.is_token_expired(&token) {
                            return Ok(token);
                        }
                    }
                    let pending =
                        refresh_once(self.provider.clone(), self.session.clone()).boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
            *slot = None;
        }
        result
    }

    /// Runs interactive sign-in and stores the resulting token.
    pub async fn login(&self, provider_id: &str) -> Result<(), AuthError> {
        let portal = self.provider.as_interactive().ok_or(AuthError::NotInteractive)?;
        match portal.login(provider_id).await {
            Ok(token) => {
                self.session.record_sign_in(token).await;
                info!(provider_id, "signed in");
                Ok(())
            }
            Err(e) => {
                if let AuthError::SignIn(message) = &e {
                    self.session.record_sign_in_failure(message.clone()).await;
                }
                warn!(provider_id, error = %e, "sign-in failed");
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(portal) = self.provider.as_interactive() {
            portal.sign_out().await?;
        }
        self.session.clear_access_token().await;
        info!("signed out");
        Ok(())
    }

    pub async fn login_options(&self) -> Vec<String> {
        match self.provider.as_interactive() {
            Some(portal) => portal.login_options().await,
            None => Vec::new(),
        }
    }

    pub async fn set_login_options(&self, providers: &[LoginProvider]) {
        if let Some(portal) = self.provider.as_interactive() {
            portal.set_login_options(providers).await;
        }
    }
}

async fn refresh_once(
    provider: Arc<CredentialProvider>,
    session: SessionStore,
) -> Result<String, AuthError> {
    let metrics = get_metrics().await;
    match provider.fetch_token().await {
        Ok(token) if !token.is_empty() => {
            session.set_access_token(token.clone()).await;
            metrics.token_refreshes.with_label_values(&["ok"]).inc();
            info!(provider = provider.kind(), "access token refreshed");
            Ok(token)
        }
        Ok(_) => {
            session.clear_access_token().await;
            metrics.token_refreshes.with_label_values(&["empty"]).inc();
            warn!(provider = provider.kind(), "provider returned no token, session cleared");
            Err(AuthError::Unauthenticated)
        }
        Err(e) => {
            session.clear_access_token().await;
            metrics.token_refreshes.with_label_values(&["error"]).inc();
            warn!(provider = provider.kind(), error = %e, "token refresh failed, session cleared");
            Err(AuthError::Unauthenticated)
        }
    }
}
