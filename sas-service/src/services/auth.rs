use std::fmt;
use std::fs;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Header carrying the bearer token; `Authorization` is accepted as a
/// conventional alias.
pub const AUTH_HEADER: &str = "authentication";
pub const AUTH_HEADER_ALIAS: &str = "authorization";

/// Entity identifier as it appears in token claims. Issuers in the wild
/// encode it as either a JSON string or an integer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Text(String),
    Number(i64),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Text(s) => f.write_str(s),
            EntityId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Claims carried by the bearer tokens issued by the game server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Opaque user identifier, informational only.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// Entity the token is bound to.
    #[serde(rename = "characterId")]
    pub entity_id: EntityId,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp). Tokens without it are rejected.
    pub iat: i64,
    /// Issuer, informational only.
    pub iss: Option<String>,
    /// Audience. Parsed but not enforced; tokens are single-audience in
    /// this deployment.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
}

/// Verifies RS256 bearer tokens and enforces entity binding.
///
/// Built once at startup. If the public key file is missing or malformed
/// the verifier starts unconfigured and every verification fails; the
/// service itself still comes up.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: Option<DecodingKey>,
}

impl TokenVerifier {
    pub fn from_pem_file(path: &str) -> Self {
        let decoding_key = match fs::read(path) {
            Ok(pem) => match DecodingKey::from_rsa_pem(&pem) {
                Ok(key) => {
                    tracing::info!("Token verifier initialized with RS256 public key from {}", path);
                    Some(key)
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse public key at {}: {}; token verification disabled",
                        path,
                        e
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read public key at {}: {}; token verification disabled",
                    path,
                    e
                );
                None
            }
        };
        Self { decoding_key }
    }

    /// Validate the token and check that its entity claim matches
    /// `expected_entity_id` after string normalization. Every failure
    /// collapses to `Unauthorized`; the cause is logged server-side only.
    pub fn verify(
        &self,
        header_value: Option<&str>,
        expected_entity_id: &str,
    ) -> Result<TokenClaims, AppError> {
        let Some(decoding_key) = &self.decoding_key else {
            tracing::error!("JWT public key not configured");
            return Err(AppError::Unauthorized);
        };

        let token = header_value.and_then(extract_token).ok_or_else(|| {
            tracing::error!("Missing bearer token");
            AppError::Unauthorized
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.validate_aud = false;

        let data = decode::<TokenClaims>(token, decoding_key, &validation).map_err(|e| {
            tracing::error!("JWT decode error: {}", e);
            AppError::Unauthorized
        })?;

        let claims = data.claims;
        let claim_entity = claims.entity_id.to_string();
        if claim_entity != expected_entity_id {
            tracing::error!(
                "JWT entity mismatch: {} != {}",
                claim_entity,
                expected_entity_id
            );
            return Err(AppError::Unauthorized);
        }

        Ok(claims)
    }
}

/// Pull the raw credential value out of the request headers, preferring
/// the service's own `Authentication` header over the alias.
pub fn credential_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTH_HEADER)
        .or_else(|| headers.get(AUTH_HEADER_ALIAS))
        .and_then(|value| value.to_str().ok())
}

/// Accepts either the bare token or an RFC 6750 `Bearer <token>` form with
/// a case-insensitive scheme. Anything else reads as no token.
fn extract_token(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let first = parts.next()?;
    match parts.next() {
        None => Some(first),
        Some(second) if parts.next().is_none() && first.eq_ignore_ascii_case("bearer") => {
            Some(second)
        }
        _ => None,
    }
}
