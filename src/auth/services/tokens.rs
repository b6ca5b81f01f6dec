//! Token issuance and validation
//!
//! Mints signed HS256 access/refresh token pairs carrying the user id, a
//! permission-scope set and a type discriminator. Validity is purely
//! cryptographic plus expiry - there is no revocation store; rotating the
//! signing secret invalidates everything signed with the old one.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use crate::auth::models::{Claims, TokenPair};
use crate::common::ApiError;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Invalid => ApiError::TokenInvalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Immutable signing configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        // Refresh tokens are signed with a key derived from the main secret,
        // so leaking one key class does not compromise the other.
        let refresh_secret = format!("{}_refresh", config.secret);

        Self {
            access_encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
        }
    }

    /// Issue a single token of the given kind
    pub fn issue(
        &self,
        user_id: &str,
        scopes: &[String],
        kind: TokenKind,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            scopes: scopes.to_vec(),
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
            token_type: kind.as_str().to_string(),
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        encode(&Header::new(Algorithm::HS256), &claims, key).map_err(|_| TokenError::Invalid)
    }

    /// Issue an access/refresh pair for the given user
    pub fn issue_pair(&self, user_id: &str, scopes: &[String]) -> Result<TokenPair, TokenError> {
        let access_token = self.issue(user_id, scopes, TokenKind::Access)?;
        let refresh_token = self.issue(user_id, scopes, TokenKind::Refresh)?;

        debug!(user_id = %user_id, scopes = ?scopes, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Validate a token of the expected kind and return its claims
    ///
    /// Fails with `Expired` when past expiry, `Invalid` on bad signature,
    /// wrong type discriminator or malformed claims.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let decoded = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256)).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        if decoded.claims.token_type != expected.as_str() {
            return Err(TokenError::Invalid);
        }

        Ok(decoded.claims)
    }
}
