//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/register` - Local registration
/// - `POST /api/auth/login` - Email/password login
/// - `POST /api/auth/naver/token` - Naver social login
/// - `POST /api/auth/kakao/token` - Kakao social login
/// - `POST /api/auth/firebase/token` - Federated ID token login
/// - `POST /api/auth/guest` - Anonymous device login
/// - `POST /api/auth/token/refresh` - Access token refresh
/// - `GET /api/me` - Current user profile
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::password_login))
        .route("/api/auth/naver/token", post(handlers::naver_login))
        .route("/api/auth/kakao/token", post(handlers::kakao_login))
        .route("/api/auth/firebase/token", post(handlers::firebase_login))
        .route("/api/auth/guest", post(handlers::guest_login))
        .route("/api/auth/token/refresh", post(handlers::refresh_token))
        .route("/api/me", get(handlers::me_handler))
}
