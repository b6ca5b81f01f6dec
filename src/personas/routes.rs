//! Persona routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the persona router
///
/// # Routes
/// - `GET /api/personas` - List personas
/// - `GET /api/personas/:id` - Get one persona
/// - `POST /api/personas` - Create a persona (admin)
pub fn personas_routes() -> Router {
    Router::new()
        .route(
            "/api/personas",
            get(handlers::list_personas).post(handlers::create_persona),
        )
        .route("/api/personas/:id", get(handlers::get_persona))
}
