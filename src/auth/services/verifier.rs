//! External identity verification
//!
//! Turns a provider-specific credential into either a local user (password
//! logins) or a provider-agnostic `NormalizedIdentity` ready for resolution.
//! Verification is read-only; all database mutation happens downstream in
//! the identity resolver.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::models::{NormalizedIdentity, Provider, User};
use crate::common::{safe_email_log, ApiError};

const NAVER_USERINFO_URL: &str = "https://openapi.naver.com/v1/nid/me";
const KAKAO_USERINFO_URL: &str = "https://kapi.kakao.com/v2/user/me";
const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A credential as presented by the client, tagged by provider
#[derive(Debug)]
pub enum Credential {
    Password { email: String, password: String },
    Naver { access_token: String },
    Kakao { access_token: String },
    Firebase { id_token: String },
    Guest { device_id: String },
}

/// Outcome of verification
///
/// Password logins authenticate against the user row directly and
/// short-circuit identity resolution; every other provider yields a
/// normalized identity to resolve.
#[derive(Debug)]
pub enum VerifiedIdentity {
    Local(User),
    External(NormalizedIdentity),
}

/// Verifier configuration, resolved once at startup
///
/// Endpoint URLs are overridable so tests can point them at a local stub.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub naver_userinfo_url: String,
    pub kakao_userinfo_url: String,
    pub firebase_jwks_url: String,
    pub firebase_project_id: Option<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            naver_userinfo_url: NAVER_USERINFO_URL.to_string(),
            kakao_userinfo_url: KAKAO_USERINFO_URL.to_string(),
            firebase_jwks_url: FIREBASE_JWKS_URL.to_string(),
            firebase_project_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

struct CachedJwks {
    fetched_at: Instant,
    keys: Vec<Jwk>,
}

/// Claims of a federated ID token after signature verification
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    firebase: Option<FirebaseInfo>,
}

#[derive(Debug, Deserialize)]
struct FirebaseInfo {
    sign_in_provider: Option<String>,
}

pub struct IdentityVerifier {
    db: SqlitePool,
    http: Client,
    config: VerifierConfig,
    jwks_cache: RwLock<Option<CachedJwks>>,
}

impl IdentityVerifier {
    pub fn new(db: SqlitePool, http: Client, config: VerifierConfig) -> Self {
        Self {
            db,
            http,
            config,
            jwks_cache: RwLock::new(None),
        }
    }

    /// Verify a presented credential and produce an identity or fail
    pub async fn verify(&self, credential: Credential) -> Result<VerifiedIdentity, ApiError> {
        match credential {
            Credential::Password { email, password } => {
                let user = self.verify_password(&email, &password).await?;
                Ok(VerifiedIdentity::Local(user))
            }
            Credential::Naver { access_token } => {
                let identity = self.verify_naver(&access_token).await?;
                Ok(VerifiedIdentity::External(identity))
            }
            Credential::Kakao { access_token } => {
                let identity = self.verify_kakao(&access_token).await?;
                Ok(VerifiedIdentity::External(identity))
            }
            Credential::Firebase { id_token } => {
                let identity = self.verify_firebase(&id_token).await?;
                Ok(VerifiedIdentity::External(identity))
            }
            Credential::Guest { device_id } => {
                let identity = verify_guest(&device_id)?;
                Ok(VerifiedIdentity::External(identity))
            }
        }
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        let user = match user {
            Some(u) => u,
            None => {
                warn!(email = %safe_email_log(email), "Password login failed: unknown email");
                return Err(ApiError::InvalidCredentials);
            }
        };

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(ApiError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, hash)
            .map_err(|e| ApiError::InternalServer(format!("password verify failed: {}", e)))?;

        if !valid {
            warn!(user_id = %user.id, "Password login failed: hash mismatch");
            return Err(ApiError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "Password login rejected: inactive user");
            return Err(ApiError::InvalidCredentials);
        }

        Ok(user)
    }

    async fn verify_naver(&self, access_token: &str) -> Result<NormalizedIdentity, ApiError> {
        debug!("Calling Naver API to get user info");

        let response = self
            .http
            .get(&self.config.naver_userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Naver userinfo endpoint unreachable");
                ApiError::ExternalAuthError("naver unreachable".to_string())
            })?;

        if !response.status().is_success() {
            warn!(http_status = %response.status(), "Naver rejected the access token");
            return Err(ApiError::ExternalAuthError("invalid naver token".to_string()));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            warn!(error = %e, "Malformed Naver userinfo payload");
            ApiError::ExternalAuthError("malformed naver payload".to_string())
        })?;

        let identity = parse_naver_profile(&body)?;
        info!(
            provider = "naver",
            provider_user_id = %identity.provider_user_id,
            "External identity verified"
        );
        Ok(identity)
    }

    async fn verify_kakao(&self, access_token: &str) -> Result<NormalizedIdentity, ApiError> {
        debug!("Calling Kakao API to get user info");

        let response = self
            .http
            .get(&self.config.kakao_userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Kakao userinfo endpoint unreachable");
                ApiError::ExternalAuthError("kakao unreachable".to_string())
            })?;

        if !response.status().is_success() {
            warn!(http_status = %response.status(), "Kakao rejected the access token");
            return Err(ApiError::ExternalAuthError("invalid kakao token".to_string()));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            warn!(error = %e, "Malformed Kakao userinfo payload");
            ApiError::ExternalAuthError("malformed kakao payload".to_string())
        })?;

        let identity = parse_kakao_profile(&body)?;
        info!(
            provider = "kakao",
            provider_user_id = %identity.provider_user_id,
            "External identity verified"
        );
        Ok(identity)
    }

    /// Verify a federated ID token signature against the platform JWKS
    async fn verify_firebase(&self, id_token: &str) -> Result<NormalizedIdentity, ApiError> {
        let project_id = self
            .config
            .firebase_project_id
            .as_deref()
            .ok_or_else(|| ApiError::InternalServer("firebase not configured".to_string()))?;

        let header = decode_header(id_token).map_err(|e| {
            warn!(error = %e, "Federated ID token header unparseable");
            ApiError::TokenInvalid
        })?;
        let kid = header.kid.ok_or(ApiError::TokenInvalid)?;

        let jwk = self.find_jwk(&kid).await?.ok_or_else(|| {
            warn!(kid = %kid, "No JWKS key matches the ID token key id");
            ApiError::TokenInvalid
        })?;

        let key =
            DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(|_| ApiError::TokenInvalid)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", project_id)]);

        let decoded = decode::<FirebaseClaims>(id_token, &key, &validation).map_err(|e| {
            warn!(error = %e, "Federated ID token verification failed");
            ApiError::TokenInvalid
        })?;

        let claims = decoded.claims;
        let sign_in_provider = claims
            .firebase
            .and_then(|f| f.sign_in_provider)
            .unwrap_or_default();

        // Anonymous platform sign-ins carry no profile; normalize them the
        // same way guest device logins are.
        let is_anonymous = sign_in_provider == "anonymous";

        info!(
            provider = "firebase",
            sign_in_provider = %sign_in_provider,
            provider_user_id = %claims.sub,
            "Federated identity verified"
        );

        Ok(NormalizedIdentity {
            provider: Provider::Firebase,
            provider_user_id: claims.sub,
            email: if is_anonymous { None } else { claims.email },
            username: if is_anonymous { None } else { claims.name },
            is_guest: is_anonymous,
        })
    }

    /// Look up a JWKS key by kid, refreshing the cache when stale or missing
    async fn find_jwk(&self, kid: &str) -> Result<Option<Jwk>, ApiError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                    return Ok(cached.keys.iter().find(|k| k.kid == kid).cloned());
                }
            }
        }

        debug!(url = %self.config.firebase_jwks_url, "Refreshing federated JWKS");

        let jwks: JwkSet = self
            .http
            .get(&self.config.firebase_jwks_url)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "JWKS endpoint unreachable");
                ApiError::ExternalAuthError("identity platform unreachable".to_string())
            })?
            .json()
            .await
            .map_err(|e| {
                warn!(error = %e, "Malformed JWKS payload");
                ApiError::ExternalAuthError("malformed jwks payload".to_string())
            })?;

        let found = jwks.keys.iter().find(|k| k.kid == kid).cloned();

        let mut cache = self.jwks_cache.write().await;
        *cache = Some(CachedJwks {
            fetched_at: Instant::now(),
            keys: jwks.keys,
        });

        Ok(found)
    }
}

/// Guest logins treat the device id as the provider subject directly and
/// always succeed for any non-empty id.
fn verify_guest(device_id: &str) -> Result<NormalizedIdentity, ApiError> {
    let device_id = device_id.trim();
    if device_id.is_empty() {
        return Err(ApiError::BadRequest("device_id is required".to_string()));
    }

    Ok(NormalizedIdentity {
        provider: Provider::Guest,
        provider_user_id: device_id.to_string(),
        email: None,
        username: None,
        is_guest: true,
    })
}

/// Extract (id, email, nickname) from a Naver userinfo payload
pub(crate) fn parse_naver_profile(
    body: &serde_json::Value,
) -> Result<NormalizedIdentity, ApiError> {
    let profile = body.get("response").cloned().unwrap_or_default();

    let id = profile
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            warn!("Naver payload missing 'id'");
            ApiError::ExternalAuthError("missing naver user id".to_string())
        })?;

    Ok(NormalizedIdentity {
        provider: Provider::Naver,
        provider_user_id: id,
        email: profile
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        username: profile
            .get("nickname")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        is_guest: false,
    })
}

/// Extract (id, email, nickname) from a Kakao userinfo payload
pub(crate) fn parse_kakao_profile(
    body: &serde_json::Value,
) -> Result<NormalizedIdentity, ApiError> {
    // Kakao ids are numeric in the payload but opaque strings to us
    let id = body
        .get("id")
        .and_then(|v| {
            v.as_i64()
                .map(|n| n.to_string())
                .or_else(|| v.as_str().map(str::to_string))
        })
        .ok_or_else(|| {
            warn!("Kakao payload missing 'id'");
            ApiError::ExternalAuthError("missing kakao user id".to_string())
        })?;

    let account = body.get("kakao_account").cloned().unwrap_or_default();

    Ok(NormalizedIdentity {
        provider: Provider::Kakao,
        provider_user_id: id,
        email: account
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        username: account
            .pointer("/profile/nickname")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        is_guest: false,
    })
}
