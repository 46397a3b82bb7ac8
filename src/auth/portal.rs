/// Interactive sign-in through the tenant portal.
///
/// The portal configuration endpoint names the identity backend and the
/// login providers enabled for the tenant. The sign-in mechanics belong to
/// a [`SignInFlow`] supplied by the embedding application.
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::AuthError;

pub const DEFAULT_LOGIN_PROVIDER: &str = "google.com";
pub const PORTAL_CONFIG_PATH: &str = "/xrm-tenants/v1/login/portalConfig";

/// Identity backend settings handed to the sign-in flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    pub project_id: Option<String>,
    pub auth_domain: Option<String>,
    pub api_key: Option<String>,
    pub app_id: Option<String>,
    pub measurement_id: Option<String>,
    #[serde(skip)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProvider {
    pub provider_id: String,
    #[serde(default)]
    pub is_enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortalConfigResponse {
    #[serde(default)]
    firebase_configs: Vec<IdentityBackend>,
    #[serde(default)]
    login_providers: Vec<LoginProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityBackend {
    #[serde(default)]
    options: IdentityConfig,
    firebase_auth_tenant: Option<String>,
}

/// The identity-provider side of interactive sign-in.
#[async_trait]
pub trait SignInFlow: Send + Sync {
    /// Called once with the portal's identity settings.
    async fn configure(&self, config: &IdentityConfig) -> Result<(), AuthError>;

    /// Runs the out-of-band sign-in and returns the signed-in user's id token.
    async fn sign_in(&self, provider_id: &str) -> Result<String, AuthError>;

    /// A fresh id token for the signed-in user, `None` when nobody is signed in.
    async fn current_user_token(&self) -> Result<Option<String>, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

pub struct PortalAuth {
    base_url: String,
    config_key: String,
    client: Client,
    flow: Box<dyn SignInFlow>,
    login_options: RwLock<Vec<String>>,
}

impl std::fmt::Debug for PortalAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalAuth")
            .field("base_url", &self.base_url)
            .field("config_key", &self.config_key)
            .finish_non_exhaustive()
    }
}

impl PortalAuth {
    pub fn new(
        base_url: impl Into<String>,
        config_key: impl Into<String>,
        client: Client,
        flow: Box<dyn SignInFlow>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            config_key: config_key.into(),
            client,
            flow,
            login_options: RwLock::new(vec![DEFAULT_LOGIN_PROVIDER.to_owned()]),
        }
    }

    /// Fetches the portal configuration, records enabled login providers
    /// and configures the sign-in flow.
    pub async fn initialize(&self) -> Result<(), AuthError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), PORTAL_CONFIG_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.config_key.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::Initialize(format!("portal config request failed: {}", e)))?;
        if !response.status().is_success() {
            error!(status = %response.status(), "portal config request rejected");
            return Err(AuthError::Initialize(format!(
                "portal config returned {}",
                response.status()
            )));
        }
        let portal: PortalConfigResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Initialize(format!("invalid portal config: {}", e)))?;

        let backend = portal
            .firebase_configs
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::Initialize("portal config has no identity backend".into()))?;
        let mut identity = backend.options;
        identity.tenant_id = backend.firebase_auth_tenant;

        self.set_login_options(&portal.login_providers).await;
        self.flow.configure(&identity).await?;
        let providers = self.login_options().await;
        info!(?providers, "portal sign-in initialized");
        Ok(())
    }

    pub async fn login_options(&self) -> Vec<String> {
        self.login_options.read().await.clone()
    }

    /// Replaces the enabled sign-in methods with the enabled entries of `providers`.
    pub async fn set_login_options(&self, providers: &[LoginProvider]) {
        let enabled = providers
            .iter()
            .filter(|p| p.is_enabled)
            .map(|p| p.provider_id.clone())
            .collect();
        *self.login_options.write().await = enabled;
    }

    pub async fn login(&self, provider_id: &str) -> Result<String, AuthError> {
        if !self.login_options.read().await.iter().any(|p| p == provider_id) {
            warn!(provider_id, "login provider is not enabled");
            return Err(AuthError::ProviderNotEnabled(provider_id.to_owned()));
        }
        self.flow.sign_in(provider_id).await
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.flow.sign_out().await
    }

    pub async fn fetch_token(&self) -> Result<String, AuthError> {
        self.flow.current_user_token().await?.ok_or(AuthError::Unauthenticated)
    }
}
