//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Login provider for an external identity link.
///
/// Password logins are not a link - they authenticate against the user row
/// directly and never create a social_accounts entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Provider {
    Naver,
    Kakao,
    Firebase,
    Guest,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Naver => "naver",
            Provider::Kakao => "kakao",
            Provider::Firebase => "firebase",
            Provider::Guest => "guest",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_guest: bool,
    pub profile_image_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// External identity link database model
///
/// (provider, provider_user_id) is unique across the system; a user may own
/// several rows, one per provider they have logged in with.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct SocialAccount {
    pub id: String,
    pub user_id: String,
    pub provider: Provider,
    pub provider_user_id: String,
    pub created_at: String,
}

/// Provider-agnostic identity produced by credential verification
#[derive(Debug, Clone)]
pub struct NormalizedIdentity {
    pub provider: Provider,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    /// Anonymous identity (guest device id or federated anonymous sign-in)
    pub is_guest: bool,
}

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub scopes: Vec<String>,
    pub iat: usize,
    pub exp: usize,
    pub token_type: String,
}

/// Signed access/refresh token pair; never persisted
#[derive(Serialize, Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

// ============================================================================
// Request / response payloads
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordLoginRequest {
    pub email: String,
    pub password: String,
}

/// Bearer access token issued by a social OAuth provider
#[derive(Deserialize)]
pub struct SocialTokenRequest {
    pub access_token: String,
}

/// Signed ID token issued by the federated identity platform
#[derive(Deserialize)]
pub struct IdTokenRequest {
    pub id_token: String,
}

/// Client-generated opaque device identifier
#[derive(Deserialize)]
pub struct GuestLoginRequest {
    pub device_id: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub is_guest: bool,
    pub profile_image_key: Option<String>,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            is_guest: user.is_guest,
            profile_image_key: user.profile_image_key.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub is_new_user: bool,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}
