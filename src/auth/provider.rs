use anyhow::{bail, Result};
use reqwest::Client;

use crate::auth::jwt;
use crate::auth::portal::PortalAuth;
use crate::auth::source::{EndpointSource, TokenSource};
use crate::config::client::CredentialConfig;
use crate::error::AuthError;

/// Identity backends. Only the interactive variant can sign a user in.
#[derive(Debug)]
pub enum CredentialProvider {
    Interactive(PortalAuth),
    NonInteractive(TokenSource),
}

impl CredentialProvider {
    /// Builds a non-interactive provider from configuration.
    ///
    /// Portal credentials need a sign-in flow and are built with
    /// [`CredentialProvider::Interactive`] instead.
    pub fn from_config(cfg: &CredentialConfig, client: &Client) -> Result<Self> {
        match cfg {
            CredentialConfig::Static { token } => {
                Ok(CredentialProvider::NonInteractive(TokenSource::Static(token.clone())))
            }
            CredentialConfig::Endpoint(endpoint) => Ok(CredentialProvider::NonInteractive(
                TokenSource::Endpoint(EndpointSource::new(endpoint.clone(), client.clone())),
            )),
            CredentialConfig::Portal { .. } => {
                bail!("portal credentials need a sign-in flow; build CredentialProvider::Interactive")
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CredentialProvider::Interactive(_) => "portal",
            CredentialProvider::NonInteractive(source) => source.name(),
        }
    }

    pub async fn initialize(&self) -> Result<(), AuthError> {
        match self {
            CredentialProvider::Interactive(portal) => portal.initialize().await,
            CredentialProvider::NonInteractive(_) => Ok(()),
        }
    }

    /// Produces a fresh token from the backend, bypassing any cache.
    pub async fn fetch_token(&self) -> Result<String, AuthError> {
        match self {
            CredentialProvider::Interactive(portal) => portal.fetch_token().await,
            CredentialProvider::NonInteractive(source) => source.fetch_token().await,
        }
    }

    pub fn is_token_expired(&self, token: &str) -> bool {
        jwt::is_token_expired(token)
    }

    pub fn as_interactive(&self) -> Option<&PortalAuth> {
        match self {
            CredentialProvider::Interactive(portal) => Some(portal),
            CredentialProvider::NonInteractive(_) => None,
        }
    }
}
