//! # Entity Client Library
//!
//! Authenticated, multi-tenant client for a metadata-driven entity API.
//! Requests carry a bearer token kept fresh by a single coalesced refresh,
//! transient failures are retried with exponential backoff, and entity
//! routes are resolved from per-tenant metadata loaded once on first use.
//!
//! Modules:
//! - `auth` — credential providers, session store and token lifecycle
//! - `config` — client configuration, env expansion and validation
//! - `transport` — retrying HTTP dispatch with bearer auth
//! - `metadata` — tenant schema cache and enum label lookup
//! - `entities` — the public CRUD surface

pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod helpers;
pub mod metadata;
pub mod observability;
pub mod resilience;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::auth::lifecycle::TokenManager;
pub use crate::auth::portal::{PortalAuth, SignInFlow};
pub use crate::auth::provider::CredentialProvider;
pub use crate::entities::client::EntityClient;
pub use crate::error::{ApiError, ApiResult, AuthError};
