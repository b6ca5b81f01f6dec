//! Conversation routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the conversation router
///
/// # Routes
/// - `POST /api/conversations` - Open a conversation against a persona
/// - `GET /api/conversations` - List own conversations
/// - `GET /api/conversations/:id/messages` - Conversation history
/// - `POST /api/conversations/:id/messages` - Send a message (one chat turn)
pub fn conversations_routes() -> Router {
    Router::new()
        .route(
            "/api/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/api/conversations/:id/messages",
            get(handlers::get_messages).post(handlers::send_message),
        )
}
