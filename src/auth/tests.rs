//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - JWT token pair issuance and validation
//! - Identity resolution (idempotency, email merge, new-user flag, races)
//! - Provider payload parsing
//! - Registration validation

#[cfg(test)]
mod tests {
    use super::super::models::{NormalizedIdentity, Provider, RegisterRequest};
    use super::super::services::{
        Credential, IdentityResolver, IdentityVerifier, SessionService, TokenConfig, TokenKind,
        TokenService, VerifiedIdentity, VerifierConfig,
    };
    use super::super::validators::validate_registration;
    use crate::common::migrations::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    fn token_service() -> TokenService {
        TokenService::new(TokenConfig {
            secret: "test_secret_key".to_string(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
        })
    }

    async fn test_pool() -> SqlitePool {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        run_migrations(&pool).await.expect("migrations failed");
        pool
    }

    fn identity(provider: Provider, subject: &str, email: Option<&str>) -> NormalizedIdentity {
        NormalizedIdentity {
            provider,
            provider_user_id: subject.to_string(),
            email: email.map(str::to_string),
            username: None,
            is_guest: provider == Provider::Guest,
        }
    }

    async fn social_account_count(pool: &SqlitePool, provider: Provider, subject: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM social_accounts WHERE provider = ? AND provider_user_id = ?",
        )
        .bind(provider)
        .bind(subject)
        .fetch_one(pool)
        .await
        .unwrap();
        count
    }

    // ========================================================================
    // Token issuer
    // ========================================================================

    #[test]
    fn test_token_pair_round_trip() {
        let tokens = token_service();
        let scopes = vec!["user".to_string()];

        let pair = tokens.issue_pair("U_TEST01", &scopes).expect("issue failed");

        let access = tokens
            .validate(&pair.access_token, TokenKind::Access)
            .expect("access validation failed");
        assert_eq!(access.sub, "U_TEST01");
        assert_eq!(access.scopes, scopes);
        assert_eq!(access.token_type, "access");

        let refresh = tokens
            .validate(&pair.refresh_token, TokenKind::Refresh)
            .expect("refresh validation failed");
        assert_eq!(refresh.sub, "U_TEST01");
        assert_eq!(refresh.token_type, "refresh");
    }

    #[test]
    fn test_token_wrong_kind_rejected() {
        let tokens = token_service();
        let pair = tokens
            .issue_pair("U_TEST02", &["user".to_string()])
            .unwrap();

        assert!(tokens
            .validate(&pair.access_token, TokenKind::Refresh)
            .is_err());
        assert!(tokens
            .validate(&pair.refresh_token, TokenKind::Access)
            .is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        use super::super::services::tokens::TokenError;

        // Negative TTL puts the expiry well past the validation leeway
        let tokens = TokenService::new(TokenConfig {
            secret: "test_secret_key".to_string(),
            access_ttl_minutes: -120,
            refresh_ttl_days: 7,
        });

        let token = tokens
            .issue("U_TEST03", &["user".to_string()], TokenKind::Access)
            .unwrap();

        match tokens.validate(&token, TokenKind::Access) {
            Err(TokenError::Expired) => {}
            other => panic!("expected expired error, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = token_service();
        let token = tokens
            .issue("U_TEST04", &["user".to_string()], TokenKind::Access)
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');

        assert!(tokens.validate(&tampered, TokenKind::Access).is_err());
    }

    #[test]
    fn test_secret_mismatch_rejected() {
        let tokens = token_service();
        let other = TokenService::new(TokenConfig {
            secret: "a_different_secret".to_string(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
        });

        let token = tokens
            .issue("U_TEST05", &["user".to_string()], TokenKind::Access)
            .unwrap();

        assert!(other.validate(&token, TokenKind::Access).is_err());
    }

    // ========================================================================
    // Identity resolver
    // ========================================================================

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let pool = test_pool().await;
        let resolver = IdentityResolver::new(pool.clone());
        let identity = identity(Provider::Kakao, "kakao-1001", Some("cat@example.com"));

        let (first, created_first) = resolver.resolve(&identity).await.unwrap();
        let (second, created_second) = resolver.resolve(&identity).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(created_first);
        assert!(!created_second);
        assert_eq!(
            social_account_count(&pool, Provider::Kakao, "kakao-1001").await,
            1
        );
    }

    #[tokio::test]
    async fn test_email_merge_links_existing_user() {
        let pool = test_pool().await;
        let resolver = IdentityResolver::new(pool.clone());

        let (naver_user, _) = resolver
            .resolve(&identity(Provider::Naver, "naver-7", Some("dog@example.com")))
            .await
            .unwrap();

        // A different provider presenting the same verified email attaches
        // to the existing user instead of creating a duplicate.
        let (kakao_user, created) = resolver
            .resolve(&identity(Provider::Kakao, "kakao-7", Some("dog@example.com")))
            .await
            .unwrap();

        assert_eq!(naver_user.id, kakao_user.id);
        assert!(!created);

        let (links,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM social_accounts WHERE user_id = ?")
                .bind(&naver_user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(links, 2);
    }

    #[tokio::test]
    async fn test_new_user_flag() {
        let pool = test_pool().await;
        let resolver = IdentityResolver::new(pool.clone());
        let identity = identity(Provider::Firebase, "fb-uid-42", None);

        let (_, created) = resolver.resolve(&identity).await.unwrap();
        assert!(created);

        let (_, created) = resolver.resolve(&identity).await.unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn test_guest_user_has_no_profile() {
        let pool = test_pool().await;
        let resolver = IdentityResolver::new(pool.clone());

        let (user, created) = resolver
            .resolve(&identity(Provider::Guest, "device-abcdef", None))
            .await
            .unwrap();

        assert!(created);
        assert!(user.is_guest);
        assert!(user.email.is_none());
        assert!(user.username.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_resolution_yields_one_user() {
        let pool = test_pool().await;
        let resolver_a = IdentityResolver::new(pool.clone());
        let resolver_b = IdentityResolver::new(pool.clone());
        let id_a = identity(Provider::Naver, "naver-race", Some("race@example.com"));
        let id_b = id_a.clone();

        let (res_a, res_b) = tokio::join!(resolver_a.resolve(&id_a), resolver_b.resolve(&id_b));

        let (user_a, _) = res_a.unwrap();
        let (user_b, _) = res_b.unwrap();

        assert_eq!(user_a.id, user_b.id);
        assert_eq!(
            social_account_count(&pool, Provider::Naver, "naver-race").await,
            1
        );
    }

    #[tokio::test]
    async fn test_lost_race_retries_as_read() {
        let pool = test_pool().await;
        let gate = Arc::new(tokio::sync::Barrier::new(2));
        let mut resolver = IdentityResolver::new(pool.clone());
        resolver.link_gate = Some(gate.clone());

        let id = identity(Provider::Naver, "naver-split", None);
        let loser = tokio::spawn(async move { resolver.resolve(&id).await });

        // The resolver has already missed its link lookup; commit the
        // competing login in the window before its insert.
        gate.wait().await;
        sqlx::query("INSERT INTO users (id) VALUES ('U_WINNER1')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO social_accounts (id, user_id, provider, provider_user_id) VALUES ('N_WINNER1', 'U_WINNER1', 'naver', 'naver-split')",
        )
        .execute(&pool)
        .await
        .unwrap();
        gate.wait().await;

        // The insert hits the unique pair and the retry resolves as a read.
        let (user, created) = loser.await.unwrap().unwrap();
        assert_eq!(user.id, "U_WINNER1");
        assert!(!created);
        assert_eq!(
            social_account_count(&pool, Provider::Naver, "naver-split").await,
            1
        );

        // The losing attempt's half-created user rolled back with its tx.
        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_unresolvable_conflict_surfaces() {
        use crate::common::ApiError;

        let pool = test_pool().await;
        sqlx::query("INSERT INTO users (id) VALUES ('U_OTHER01')")
            .execute(&pool)
            .await
            .unwrap();

        // Every link insert is beaten to the unique pair inside its own
        // statement, so the retry read never finds a committed row.
        sqlx::query(
            r#"
            CREATE TRIGGER competing_link BEFORE INSERT ON social_accounts
            BEGIN
                INSERT INTO social_accounts (id, user_id, provider, provider_user_id)
                VALUES ('N_RIVAL01', 'U_OTHER01', NEW.provider, NEW.provider_user_id);
            END
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let resolver = IdentityResolver::new(pool.clone());
        let result = resolver
            .resolve(&identity(Provider::Kakao, "kakao-rival", None))
            .await;

        assert!(matches!(result, Err(ApiError::AccountConflict)));
    }

    // ========================================================================
    // Session issuer
    // ========================================================================

    fn session_service(pool: &SqlitePool) -> SessionService {
        let tokens = Arc::new(token_service());
        let verifier = IdentityVerifier::new(
            pool.clone(),
            reqwest::Client::new(),
            VerifierConfig::default(),
        );
        let resolver = IdentityResolver::new(pool.clone());
        SessionService::new(pool.clone(), verifier, resolver, tokens)
    }

    #[tokio::test]
    async fn test_guest_login_always_succeeds() {
        let pool = test_pool().await;
        let session = session_service(&pool);

        let outcome = session
            .login(Credential::Guest {
                device_id: "device-xyz-123".to_string(),
            })
            .await
            .expect("guest login failed");

        assert!(outcome.is_new_user);
        assert!(outcome.user.email.is_none());
        assert!(outcome.user.username.is_none());
        assert!(!outcome.tokens.access_token.is_empty());
        assert!(!outcome.tokens.refresh_token.is_empty());

        let again = session
            .login(Credential::Guest {
                device_id: "device-xyz-123".to_string(),
            })
            .await
            .unwrap();
        assert!(!again.is_new_user);
        assert_eq!(again.user.id, outcome.user.id);
    }

    #[tokio::test]
    async fn test_register_then_password_login() {
        let pool = test_pool().await;
        let session = session_service(&pool);

        let registered = session
            .register("owner@example.com", "hunter2hunter2", Some("owner"))
            .await
            .unwrap();
        assert!(registered.is_new_user);

        let logged_in = session
            .login(Credential::Password {
                email: "owner@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(logged_in.user.id, registered.user.id);
        assert!(!logged_in.is_new_user);
    }

    #[tokio::test]
    async fn test_password_login_rejects_bad_password() {
        use crate::common::ApiError;

        let pool = test_pool().await;
        let session = session_service(&pool);

        session
            .register("owner@example.com", "hunter2hunter2", None)
            .await
            .unwrap();

        let result = session
            .login(Credential::Password {
                email: "owner@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_password_login_never_links_social_account() {
        let pool = test_pool().await;
        let session = session_service(&pool);

        session
            .register("owner@example.com", "hunter2hunter2", None)
            .await
            .unwrap();
        session
            .login(Credential::Password {
                email: "owner@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM social_accounts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token() {
        let pool = test_pool().await;
        let session = session_service(&pool);
        let tokens = token_service();

        let outcome = session
            .login(Credential::Guest {
                device_id: "device-refresh".to_string(),
            })
            .await
            .unwrap();

        let access = session
            .refresh(&outcome.tokens.refresh_token)
            .await
            .expect("refresh failed");

        let claims = tokens.validate(&access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, outcome.user.id);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let pool = test_pool().await;
        let session = session_service(&pool);

        let outcome = session
            .login(Credential::Guest {
                device_id: "device-refresh-2".to_string(),
            })
            .await
            .unwrap();

        // Passing the access token where a refresh token is expected
        assert!(session.refresh(&outcome.tokens.access_token).await.is_err());
    }

    // ========================================================================
    // Verifier payload parsing
    // ========================================================================

    #[tokio::test]
    async fn test_verifier_guest_identity() {
        let pool = test_pool().await;
        let verifier = IdentityVerifier::new(
            pool.clone(),
            reqwest::Client::new(),
            VerifierConfig::default(),
        );

        let verified = verifier
            .verify(Credential::Guest {
                device_id: "  device-77  ".to_string(),
            })
            .await
            .unwrap();

        match verified {
            VerifiedIdentity::External(identity) => {
                assert_eq!(identity.provider, Provider::Guest);
                assert_eq!(identity.provider_user_id, "device-77");
                assert!(identity.is_guest);
                assert!(identity.email.is_none());
            }
            VerifiedIdentity::Local(_) => panic!("guest should produce an external identity"),
        }
    }

    #[tokio::test]
    async fn test_verifier_rejects_empty_device_id() {
        let pool = test_pool().await;
        let verifier = IdentityVerifier::new(
            pool.clone(),
            reqwest::Client::new(),
            VerifierConfig::default(),
        );

        assert!(verifier
            .verify(Credential::Guest {
                device_id: "   ".to_string(),
            })
            .await
            .is_err());
    }

    #[test]
    fn test_parse_naver_profile() {
        use super::super::services::verifier::parse_naver_profile;

        let body = serde_json::json!({
            "resultcode": "00",
            "message": "success",
            "response": {
                "id": "naver-user-9",
                "email": "n@example.com",
                "nickname": "nine"
            }
        });

        let identity = parse_naver_profile(&body).unwrap();
        assert_eq!(identity.provider, Provider::Naver);
        assert_eq!(identity.provider_user_id, "naver-user-9");
        assert_eq!(identity.email.as_deref(), Some("n@example.com"));
        assert_eq!(identity.username.as_deref(), Some("nine"));
    }

    #[test]
    fn test_parse_naver_profile_missing_id() {
        use super::super::services::verifier::parse_naver_profile;

        let body = serde_json::json!({ "response": { "email": "n@example.com" } });
        assert!(parse_naver_profile(&body).is_err());
    }

    #[test]
    fn test_parse_kakao_profile() {
        use super::super::services::verifier::parse_kakao_profile;

        let body = serde_json::json!({
            "id": 123456789,
            "kakao_account": {
                "email": "k@example.com",
                "profile": { "nickname": "kay" }
            }
        });

        let identity = parse_kakao_profile(&body).unwrap();
        assert_eq!(identity.provider, Provider::Kakao);
        assert_eq!(identity.provider_user_id, "123456789");
        assert_eq!(identity.email.as_deref(), Some("k@example.com"));
        assert_eq!(identity.username.as_deref(), Some("kay"));
    }

    #[test]
    fn test_parse_kakao_profile_without_account() {
        use super::super::services::verifier::parse_kakao_profile;

        let body = serde_json::json!({ "id": 42 });
        let identity = parse_kakao_profile(&body).unwrap();
        assert_eq!(identity.provider_user_id, "42");
        assert!(identity.email.is_none());
        assert!(identity.username.is_none());
    }

    // ========================================================================
    // Registration validation
    // ========================================================================

    #[test]
    fn test_registration_validation() {
        let valid = RegisterRequest {
            email: "user@example.com".to_string(),
            password: "longenough".to_string(),
            username: Some("user".to_string()),
        };
        assert!(validate_registration(&valid).is_valid);

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "longenough".to_string(),
            username: None,
        };
        assert!(!validate_registration(&bad_email).is_valid);

        let short_password = RegisterRequest {
            email: "user@example.com".to_string(),
            password: "short".to_string(),
            username: None,
        };
        assert!(!validate_registration(&short_password).is_valid);
    }
}
