//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::User;
use super::services::TokenKind;
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer access token and loads the user from the database.
#[derive(Debug)]
pub struct AuthedUser {
    pub id: String,
    pub is_admin: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let token = match token {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        // Handle "Bearer <token>" format or raw token
        let bare_token = token.strip_prefix("Bearer ").unwrap_or(&token);

        let claims = app_state
            .tokens
            .validate(bare_token, TokenKind::Access)
            .map_err(|e| {
                warn!(token = %safe_token_log(bare_token), "Access token rejected");
                e
            })?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&claims.sub)
            .fetch_optional(&app_state.db)
            .await?;

        match user {
            Some(u) if u.is_active => {
                let is_admin = claims.scopes.iter().any(|s| s == "admin") && u.is_superuser;
                debug!(
                    user_id = %u.id,
                    email = %u.email.as_deref().map(safe_email_log).unwrap_or_default(),
                    is_admin = is_admin,
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser { id: u.id, is_admin })
            }
            Some(u) => {
                warn!(user_id = %u.id, "Authentication failed: inactive user");
                Err(ApiError::Unauthorized("inactive user".into()))
            }
            None => {
                warn!(user_id = %claims.sub, "Authentication failed: user not found in database");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}
