//! Conversation handlers

use axum::extract::{Extension, Json, Path};
use std::sync::Arc;

use super::models::{ChatTurnResponse, Conversation, CreateConversation, Message, SendMessage};
use super::services::ChatService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

fn chat_service(state: &AppState) -> ChatService {
    ChatService::new(state.db.clone(), state.gemini.clone())
}

/// POST /api/conversations
pub async fn create_conversation(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Json(payload): Json<CreateConversation>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = chat_service(&state)
        .create_conversation(&authed.id, &payload.persona_id, payload.title.as_deref())
        .await?;

    Ok(Json(conversation))
}

/// GET /api/conversations
pub async fn list_conversations(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = chat_service(&state).list_conversations(&authed.id).await?;
    Ok(Json(conversations))
}

/// GET /api/conversations/{id}/messages
pub async fn get_messages(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = chat_service(&state)
        .get_messages(&authed.id, &conversation_id)
        .await?;
    Ok(Json(messages))
}

/// POST /api/conversations/{id}/messages
/// One chat turn against the conversation's persona
pub async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Path(conversation_id): Path<String>,
    Json(payload): Json<SendMessage>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::ValidationError("content is required".to_string()));
    }
    if content.len() > 4000 {
        return Err(ApiError::ValidationError(
            "content must be less than 4000 characters".to_string(),
        ));
    }

    let (user_message, assistant_message) = chat_service(&state)
        .send_message(&authed.id, &conversation_id, content)
        .await?;

    Ok(Json(ChatTurnResponse {
        user_message,
        assistant_message,
    }))
}
