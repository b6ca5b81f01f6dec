//! Session issuance
//!
//! Composes the verifier, resolver and token issuer into the public login
//! contract: verify the credential, resolve it to a local user, issue a
//! token pair. Verifier and resolver errors propagate unmodified.

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::auth::models::{TokenPair, User};
use crate::auth::services::resolver::IdentityResolver;
use crate::auth::services::tokens::{TokenKind, TokenService};
use crate::auth::services::verifier::{Credential, IdentityVerifier, VerifiedIdentity};
use crate::common::{generate_user_id, safe_email_log, ApiError};

pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
    /// True iff the resolver executed its create-user branch; callers use
    /// this to trigger onboarding flows.
    pub is_new_user: bool,
}

pub struct SessionService {
    db: SqlitePool,
    verifier: IdentityVerifier,
    resolver: IdentityResolver,
    tokens: Arc<TokenService>,
}

impl SessionService {
    pub fn new(
        db: SqlitePool,
        verifier: IdentityVerifier,
        resolver: IdentityResolver,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            db,
            verifier,
            resolver,
            tokens,
        }
    }

    /// Log a user in with any supported credential
    pub async fn login(&self, credential: Credential) -> Result<LoginOutcome, ApiError> {
        let (user, is_new_user) = match self.verifier.verify(credential).await? {
            // Password verification already produced the user; no external
            // identity to resolve or link.
            VerifiedIdentity::Local(user) => (user, false),
            VerifiedIdentity::External(identity) => self.resolver.resolve(&identity).await?,
        };

        if !user.is_active {
            return Err(ApiError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_pair(&user.id, &scopes_for(&user))?;

        info!(
            user_id = %user.id,
            is_new_user = is_new_user,
            "Login successful"
        );

        Ok(LoginOutcome {
            user,
            tokens,
            is_new_user,
        })
    }

    /// Exchange a valid refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let claims = self.tokens.validate(refresh_token, TokenKind::Refresh)?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&claims.sub)
            .fetch_optional(&self.db)
            .await?;

        let user = match user {
            Some(u) if u.is_active => u,
            _ => return Err(ApiError::TokenInvalid),
        };

        // Scopes are re-derived from current user state rather than copied
        // from the refresh token, so privilege changes take effect here.
        let access_token = self
            .tokens
            .issue(&user.id, &scopes_for(&user), TokenKind::Access)?;

        Ok(access_token)
    }

    /// Local registration with email and password
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<LoginOutcome, ApiError> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::InternalServer(format!("password hash failed: {}", e)))?;

        let user_id = generate_user_id();

        sqlx::query("INSERT INTO users (id, email, username, password_hash) VALUES (?, ?, ?, ?)")
            .bind(&user_id)
            .bind(email)
            .bind(username)
            .bind(&password_hash)
            .execute(&self.db)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    ApiError::BadRequest("email already registered".to_string())
                }
                _ => ApiError::DatabaseError(e),
            })?;

        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&user_id)
            .fetch_one(&self.db)
            .await?;

        let tokens = self.tokens.issue_pair(&user.id, &scopes_for(&user))?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(email),
            "Local registration completed"
        );

        Ok(LoginOutcome {
            user,
            tokens,
            is_new_user: true,
        })
    }
}

/// Permission scopes embedded in issued tokens
pub fn scopes_for(user: &User) -> Vec<String> {
    let mut scopes = vec!["user".to_string()];
    if user.is_superuser {
        scopes.push("admin".to_string());
    }
    scopes
}
