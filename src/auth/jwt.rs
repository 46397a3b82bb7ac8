use anyhow::{anyhow, Result};
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::helpers::time::now_u64;

#[derive(Debug, Deserialize)]
pub struct JwtClaims {
    pub exp: u64,
}

pub fn decode_jwt_claims(token: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(anyhow!("invalid JWT format"));
    }

    // tolerate padded payloads from non-conforming issuers
    let payload = parts[1].trim_end_matches('=');
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| anyhow!("base64 decode error: {}", e))?;

    serde_json::from_slice::<JwtClaims>(&decoded).map_err(|e| anyhow!("invalid JWT payload: {}", e))
}

/// A token is usable only while now is strictly before its `exp` claim.
/// Undecodable tokens count as expired.
pub fn is_token_expired(token: &str) -> bool {
    match decode_jwt_claims(token) {
        Ok(claims) => now_u64() >= claims.exp,
        Err(e) => {
            debug!(error = %e, "token claims not decodable, treating as expired");
            true
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_test_jwt(exp: i64) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = engine.encode(serde_json::json!({"exp": exp, "sub": "user-1"}).to_string());
    format!("{}.{}.signature", header, payload)
}
