//! Tests for conversations module

#[cfg(test)]
mod tests {
    use super::super::services::ChatService;
    use crate::common::migrations::run_migrations;
    use crate::common::ApiError;
    use crate::services::gemini::{GeminiConfig, GeminiService};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        run_migrations(&pool).await.expect("migrations failed");
        pool
    }

    async fn seed_user(pool: &SqlitePool, id: &str) {
        sqlx::query("INSERT INTO users (id, is_guest) VALUES (?, 1)")
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn seed_persona(pool: &SqlitePool, id: &str) {
        sqlx::query("INSERT INTO personas (id, name, system_prompt) VALUES (?, 'Detective', 'You are a detective.')")
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    fn chat_service(pool: &SqlitePool) -> ChatService {
        // No API key: AI calls fail, which several tests rely on
        let gemini = Arc::new(GeminiService::new(
            reqwest::Client::new(),
            GeminiConfig::default(),
        ));
        ChatService::new(pool.clone(), gemini)
    }

    #[tokio::test]
    async fn test_create_and_list_conversations() {
        let pool = test_pool().await;
        seed_user(&pool, "U_OWNER1").await;
        seed_persona(&pool, "P_DET001").await;
        let service = chat_service(&pool);

        let created = service
            .create_conversation("U_OWNER1", "P_DET001", Some("case one"))
            .await
            .unwrap();
        assert_eq!(created.persona_id, "P_DET001");
        assert_eq!(created.title.as_deref(), Some("case one"));

        let listed = service.list_conversations("U_OWNER1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        let messages = service
            .get_messages("U_OWNER1", &created.id)
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_messages_keep_insertion_order() {
        let pool = test_pool().await;
        seed_user(&pool, "U_OWNER1").await;
        seed_persona(&pool, "P_DET001").await;
        let service = chat_service(&pool);

        let created = service
            .create_conversation("U_OWNER1", "P_DET001", None)
            .await
            .unwrap();

        // Both halves of a turn land in the same created_at second and the
        // random ids here sort against insertion order, so only rowid can
        // keep the user message ahead of the reply.
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender, content) VALUES ('M_ZZZZZZ', ?, 'user', 'who did it?')",
        )
        .bind(&created.id)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender, content) VALUES ('M_AAAAAA', ?, 'assistant', 'the butler')",
        )
        .bind(&created.id)
        .execute(&pool)
        .await
        .unwrap();

        let messages = service
            .get_messages("U_OWNER1", &created.id)
            .await
            .unwrap();
        let senders: Vec<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
        assert_eq!(senders, ["user", "assistant"]);
    }

    #[tokio::test]
    async fn test_unknown_persona_rejected() {
        let pool = test_pool().await;
        seed_user(&pool, "U_OWNER1").await;
        let service = chat_service(&pool);

        let result = service
            .create_conversation("U_OWNER1", "P_MISSING", None)
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_conversation_ownership_enforced() {
        let pool = test_pool().await;
        seed_user(&pool, "U_OWNER1").await;
        seed_user(&pool, "U_OTHER1").await;
        seed_persona(&pool, "P_DET001").await;
        let service = chat_service(&pool);

        let created = service
            .create_conversation("U_OWNER1", "P_DET001", None)
            .await
            .unwrap();

        let result = service.get_messages("U_OTHER1", &created.id).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_ai_call_persists_nothing() {
        let pool = test_pool().await;
        seed_user(&pool, "U_OWNER1").await;
        seed_persona(&pool, "P_DET001").await;
        let service = chat_service(&pool);

        let created = service
            .create_conversation("U_OWNER1", "P_DET001", None)
            .await
            .unwrap();

        // Gemini is unconfigured here, so the AI call fails before any insert
        let result = service
            .send_message("U_OWNER1", &created.id, "hello?")
            .await;
        assert!(matches!(result, Err(ApiError::ServiceUnavailable(_))));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
