//! Identity resolution
//!
//! Maps a normalized external identity onto exactly one local user, creating
//! the user and/or the social-account link as needed. The lookup order is:
//! existing (provider, provider_user_id) link, then user by email, then a
//! fresh user. Everything after the link lookup runs in one transaction;
//! a uniqueness violation from a concurrent login is retried once as a
//! re-read before surfacing as an account conflict.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::models::{NormalizedIdentity, SocialAccount, User};
use crate::common::{generate_social_account_id, generate_user_id, safe_email_log, ApiError};

pub struct IdentityResolver {
    db: SqlitePool,
    /// Sync point between the link lookup and the write window, so tests
    /// can commit a competing login in the gap a concurrent request leaves.
    #[cfg(test)]
    pub(crate) link_gate: Option<std::sync::Arc<tokio::sync::Barrier>>,
}

impl IdentityResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            #[cfg(test)]
            link_gate: None,
        }
    }

    /// Resolve an external identity to its local user
    ///
    /// Returns the user and whether the create-user branch ran, which callers
    /// surface as `is_new_user` to trigger onboarding.
    pub async fn resolve(&self, identity: &NormalizedIdentity) -> Result<(User, bool), ApiError> {
        match self.try_resolve(identity).await {
            Err(e) if is_unique_violation(&e) => {
                warn!(
                    provider = %identity.provider,
                    provider_user_id = %identity.provider_user_id,
                    "Uniqueness conflict during resolve, retrying as read"
                );
                self.try_resolve(identity).await.map_err(|retry_err| {
                    if is_unique_violation(&retry_err) {
                        ApiError::AccountConflict
                    } else {
                        retry_err
                    }
                })
            }
            other => other,
        }
    }

    async fn try_resolve(&self, identity: &NormalizedIdentity) -> Result<(User, bool), ApiError> {
        // Fast idempotent path: the external identity is already linked.
        let link: Option<SocialAccount> = sqlx::query_as(
            "SELECT * FROM social_accounts WHERE provider = ? AND provider_user_id = ?",
        )
        .bind(identity.provider)
        .bind(&identity.provider_user_id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(link) = link {
            let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
                .bind(&link.user_id)
                .fetch_one(&self.db)
                .await?;
            return Ok((user, false));
        }

        #[cfg(test)]
        if let Some(gate) = &self.link_gate {
            gate.wait().await;
            gate.wait().await;
        }

        let mut tx = self.db.begin().await?;

        // Email merge: a user who registered with another method gets this
        // provider linked instead of a duplicate account.
        let mut existing: Option<User> = None;
        if let Some(email) = &identity.email {
            existing = sqlx::query_as("SELECT * FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(user) = &existing {
                info!(
                    user_id = %user.id,
                    provider = %identity.provider,
                    email = %safe_email_log(email),
                    "Linking new provider to existing user by email"
                );
            }
        }

        let (user, created) = match existing {
            Some(user) => (user, false),
            None => {
                let user_id = generate_user_id();
                // Guests carry no profile at all; other providers fall back
                // to a derived username when none was supplied.
                let username = if identity.is_guest {
                    None
                } else {
                    identity.username.clone().or_else(|| {
                        let prefix: String = identity.provider_user_id.chars().take(8).collect();
                        Some(format!("{}_{}", identity.provider, prefix))
                    })
                };

                sqlx::query(
                    "INSERT INTO users (id, email, username, is_guest) VALUES (?, ?, ?, ?)",
                )
                .bind(&user_id)
                .bind(&identity.email)
                .bind(&username)
                .bind(identity.is_guest)
                .execute(&mut *tx)
                .await?;

                let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
                    .bind(&user_id)
                    .fetch_one(&mut *tx)
                    .await?;

                info!(
                    user_id = %user.id,
                    provider = %identity.provider,
                    is_guest = identity.is_guest,
                    "Created new user for external identity"
                );

                (user, true)
            }
        };

        sqlx::query(
            "INSERT INTO social_accounts (id, user_id, provider, provider_user_id) VALUES (?, ?, ?, ?)",
        )
        .bind(generate_social_account_id())
        .bind(&user.id)
        .bind(identity.provider)
        .bind(&identity.provider_user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            user_id = %user.id,
            provider = %identity.provider,
            provider_user_id = %identity.provider_user_id,
            is_new_user = created,
            "External identity resolved"
        );

        Ok((user, created))
    }
}

fn is_unique_violation(e: &ApiError) -> bool {
    matches!(e, ApiError::DatabaseError(sqlx::Error::Database(db)) if db.is_unique_violation())
}
