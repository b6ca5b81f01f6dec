// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::services::{SessionService, TokenService};
use crate::services::{GeminiService, S3Service};

/// Application state containing database pool, services, and configuration
///
/// All configuration is resolved at startup and immutable afterwards, so the
/// state is shared as a plain `Arc<AppState>` extension. The shared reqwest
/// client lives inside the services that make outbound calls.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<SessionService>,
    pub gemini: Arc<GeminiService>,
    pub s3: Arc<S3Service>,
}
