//! Chat orchestration
//!
//! One chat turn is a strict pipeline: load the conversation and its
//! persona, fetch the history, make one AI call, then persist the user and
//! assistant messages. Nothing is written unless the AI call succeeded, so
//! a cancelled or failed request leaves no partial turn behind.

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info};

use crate::common::error::ApiError;
use crate::common::id_generator::{generate_conversation_id, generate_message_id};
use crate::conversations::models::{Conversation, Message};
use crate::personas::Persona;
use crate::services::gemini::{ChatRole, ChatTurn, GeminiService};

pub struct ChatService {
    db: SqlitePool,
    gemini: Arc<GeminiService>,
}

impl ChatService {
    pub fn new(db: SqlitePool, gemini: Arc<GeminiService>) -> Self {
        Self { db, gemini }
    }

    /// Open a new conversation against a persona
    pub async fn create_conversation(
        &self,
        user_id: &str,
        persona_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, ApiError> {
        let persona: Option<Persona> = sqlx::query_as("SELECT * FROM personas WHERE id = ?")
            .bind(persona_id)
            .fetch_optional(&self.db)
            .await?;

        if persona.is_none() {
            return Err(ApiError::NotFound("persona not found".to_string()));
        }

        let conversation_id = generate_conversation_id();

        sqlx::query(
            "INSERT INTO conversations (id, user_id, persona_id, title) VALUES (?, ?, ?, ?)",
        )
        .bind(&conversation_id)
        .bind(user_id)
        .bind(persona_id)
        .bind(title)
        .execute(&self.db)
        .await?;

        let conversation: Conversation = sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
            .bind(&conversation_id)
            .fetch_one(&self.db)
            .await?;

        info!(
            conversation_id = %conversation.id,
            user_id = %user_id,
            persona_id = %persona_id,
            "Conversation created"
        );

        Ok(conversation)
    }

    /// List a user's conversations, most recent first
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ApiError> {
        let conversations: Vec<Conversation> = sqlx::query_as(
            "SELECT * FROM conversations WHERE user_id = ? ORDER BY rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(conversations)
    }

    /// Load a conversation, enforcing ownership
    pub async fn get_owned_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Conversation, ApiError> {
        let conversation: Option<Conversation> =
            sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
                .bind(conversation_id)
                .fetch_optional(&self.db)
                .await?;

        match conversation {
            Some(c) if c.user_id == user_id => Ok(c),
            // Not distinguishing "exists but not yours" keeps conversation
            // ids unguessable.
            _ => Err(ApiError::NotFound("conversation not found".to_string())),
        }
    }

    /// Messages of a conversation in chronological order
    pub async fn get_messages(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<Message>, ApiError> {
        self.get_owned_conversation(user_id, conversation_id).await?;

        // Message ids are random and created_at has second resolution, so
        // rowid is the only column that carries insertion order.
        let messages: Vec<Message> = sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.db)
        .await?;

        Ok(messages)
    }

    /// Run one chat turn: history fetch, one AI call, two inserts
    pub async fn send_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        content: &str,
    ) -> Result<(Message, Message), ApiError> {
        let conversation = self.get_owned_conversation(user_id, conversation_id).await?;

        let persona: Persona = sqlx::query_as("SELECT * FROM personas WHERE id = ?")
            .bind(&conversation.persona_id)
            .fetch_one(&self.db)
            .await?;

        let history: Vec<Message> = sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.db)
        .await?;

        let turns: Vec<ChatTurn> = history
            .iter()
            .map(|m| ChatTurn {
                role: if m.sender == "assistant" {
                    ChatRole::Assistant
                } else {
                    ChatRole::User
                },
                text: m.content.clone(),
            })
            .collect();

        let reply = self
            .gemini
            .get_chat_response(&persona.system_prompt, &turns, content)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    conversation_id = %conversation_id,
                    "AI chat call failed"
                );
                ApiError::ServiceUnavailable("AI service unavailable".to_string())
            })?;

        // Both sides of the turn commit together.
        let user_message_id = generate_message_id();
        let assistant_message_id = generate_message_id();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender, content) VALUES (?, ?, 'user', ?)",
        )
        .bind(&user_message_id)
        .bind(conversation_id)
        .bind(content)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender, content) VALUES (?, ?, 'assistant', ?)",
        )
        .bind(&assistant_message_id)
        .bind(conversation_id)
        .bind(&reply)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let user_message: Message = sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(&user_message_id)
            .fetch_one(&self.db)
            .await?;
        let assistant_message: Message = sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(&assistant_message_id)
            .fetch_one(&self.db)
            .await?;

        info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            history_len = history.len(),
            "Chat turn completed"
        );

        Ok((user_message, assistant_message))
    }
}
