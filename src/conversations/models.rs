//! Conversation and message data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Conversation database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub persona_id: String,
    pub title: Option<String>,
    pub created_at: String,
}

/// Message database model
///
/// `sender` is either "user" or "assistant".
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct CreateConversation {
    pub persona_id: String,
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct SendMessage {
    pub content: String,
}

/// Both sides of one completed chat turn
#[derive(Serialize)]
pub struct ChatTurnResponse {
    pub user_message: Message,
    pub assistant_message: Message,
}
