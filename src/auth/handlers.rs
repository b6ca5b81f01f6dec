//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use super::extractors::AuthedUser;
use super::models::{
    GuestLoginRequest, IdTokenRequest, LoginResponse, PasswordLoginRequest, RefreshRequest,
    RefreshResponse, RegisterRequest, SocialTokenRequest, User, UserResponse,
};
use super::services::{Credential, LoginOutcome};
use super::validators::validate_registration;
use crate::common::{ApiError, AppState};

fn login_response(outcome: LoginOutcome) -> Json<LoginResponse> {
    Json(LoginResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        token_type: outcome.tokens.token_type,
        is_new_user: outcome.is_new_user,
        user: UserResponse::from(&outcome.user),
    })
}

/// POST /api/auth/register
/// Local registration with email and password
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let validation = validate_registration(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let outcome = state
        .auth
        .register(&payload.email, &payload.password, payload.username.as_deref())
        .await?;

    Ok(login_response(outcome))
}

/// POST /api/auth/login
/// Email/password login
pub async fn password_login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PasswordLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .auth
        .login(Credential::Password {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(login_response(outcome))
}

/// POST /api/auth/naver/token
/// Login with a Naver-issued OAuth access token
pub async fn naver_login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SocialTokenRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("Received Naver login request");

    let outcome = state
        .auth
        .login(Credential::Naver {
            access_token: payload.access_token,
        })
        .await?;

    Ok(login_response(outcome))
}

/// POST /api/auth/kakao/token
/// Login with a Kakao-issued OAuth access token
pub async fn kakao_login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SocialTokenRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("Received Kakao login request");

    let outcome = state
        .auth
        .login(Credential::Kakao {
            access_token: payload.access_token,
        })
        .await?;

    Ok(login_response(outcome))
}

/// POST /api/auth/firebase/token
/// Login with a federated ID token
pub async fn firebase_login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<IdTokenRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("Received federated ID token login request");

    let outcome = state
        .auth
        .login(Credential::Firebase {
            id_token: payload.id_token,
        })
        .await?;

    Ok(login_response(outcome))
}

/// POST /api/auth/guest
/// Anonymous login with a client-generated device identifier
pub async fn guest_login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<GuestLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .auth
        .login(Credential::Guest {
            device_id: payload.device_id,
        })
        .await?;

    Ok(login_response(outcome))
}

/// POST /api/auth/token/refresh
/// Exchange a refresh token for a new access token
pub async fn refresh_token(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let access_token = state.auth.refresh(&payload.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /api/me
/// Current user profile
pub async fn me_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(UserResponse::from(&user)))
}
