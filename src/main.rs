// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod conversations;
mod logging_middleware;
mod personas;
mod services;
mod storage;

use auth::services::{
    IdentityResolver, IdentityVerifier, SessionService, TokenConfig, TokenService, VerifierConfig,
};
use common::AppState;
use services::{GeminiConfig, GeminiService, S3Config, S3Service};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://persona_chat.db".to_string());
    let jwt_secret =
        env::var("JWT_SECRET").unwrap_or_else(|_| "replace_with_strong_secret".to_string());
    if jwt_secret == "replace_with_strong_secret" {
        warn!("JWT_SECRET not set, using an insecure default");
    }
    let access_ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(30);
    let refresh_ttl_days = env::var("REFRESH_TOKEN_EXPIRE_DAYS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(7);
    let firebase_project_id = env::var("FIREBASE_PROJECT_ID").ok();
    let gemini_api_key = env::var("GEMINI_API_KEY").ok();
    let gemini_model = env::var("GEMINI_MODEL").ok();
    let aws_access_key_id = env::var("AWS_ACCESS_KEY_ID").ok();
    let aws_secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
    let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "ap-northeast-2".to_string());
    let s3_bucket = env::var("S3_BUCKET").ok();

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().no_proxy().build()?;

    let token_service = Arc::new(TokenService::new(TokenConfig {
        secret: jwt_secret,
        access_ttl_minutes,
        refresh_ttl_days,
    }));
    info!("TokenService initialized");

    let verifier = IdentityVerifier::new(
        pool.clone(),
        http_client.clone(),
        VerifierConfig {
            firebase_project_id,
            ..VerifierConfig::default()
        },
    );
    info!("IdentityVerifier initialized");

    let resolver = IdentityResolver::new(pool.clone());

    let session_service = Arc::new(SessionService::new(
        pool.clone(),
        verifier,
        resolver,
        token_service.clone(),
    ));
    info!("SessionService initialized");

    let gemini_service = Arc::new(GeminiService::new(
        http_client,
        GeminiConfig {
            api_key: gemini_api_key,
            model: gemini_model.unwrap_or_else(|| GeminiConfig::default().model),
            ..GeminiConfig::default()
        },
    ));
    info!("GeminiService initialized");

    let s3_service = Arc::new(S3Service::new(S3Config {
        access_key_id: aws_access_key_id,
        secret_access_key: aws_secret_access_key,
        region: aws_region,
        bucket: s3_bucket,
    }));
    info!("S3Service initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let shared = Arc::new(AppState {
        db: pool,
        tokens: token_service,
        auth: session_service,
        gemini: gemini_service,
        s3: s3_service,
    });

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        // ====================================================================
        // AUTHENTICATION ROUTES
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // PERSONA ROUTES
        // ====================================================================
        .merge(personas::personas_routes())
        // ====================================================================
        // CONVERSATION ROUTES
        // ====================================================================
        .merge(conversations::conversations_routes())
        // ====================================================================
        // STORAGE ROUTES (Presigned S3 URLs)
        // ====================================================================
        .merge(storage::storage_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared.clone()))
        .layer({
            // Get CORS origins from environment variable
            let cors_origins = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| {
                "http://localhost:3000,http://localhost:5173".to_string()
            });

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
