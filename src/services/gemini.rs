// src/services/gemini.rs
//
// Client for the Gemini generateContent REST endpoint. One call per chat
// turn: system prompt + prior history + the new user message in, a single
// structured reply out.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("API key not configured")]
    NotConfigured,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// One prior turn of a conversation, already persisted
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    // Gemini calls the assistant role "model"
    fn as_wire_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    #[serde(rename = "system_instruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

pub struct GeminiService {
    http: Client,
    config: GeminiConfig,
}

impl GeminiService {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        if config.api_key.is_none() {
            warn!("GeminiService: no API key configured, chat requests will fail");
        }
        Self { http, config }
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Request one chat reply for the given system prompt, history and message
    pub async fn get_chat_response(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        user_message: &str,
    ) -> Result<String, GeminiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GeminiError::NotConfigured)?;

        let request = build_chat_request(system_prompt, history, user_message);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, api_key
        );

        debug!(
            model = %self.config.model,
            history_len = history.len(),
            "Sending chat request to Gemini"
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gemini endpoint unreachable");
                GeminiError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(http_status = %status, body = %body, "Gemini returned an error status");
            return Err(GeminiError::RequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response");
            GeminiError::InvalidResponse(e.to_string())
        })?;

        let reply = parsed
            .candidates
            .and_then(|mut c| {
                if c.is_empty() {
                    None
                } else {
                    c.remove(0).content
                }
            })
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| GeminiError::InvalidResponse("no candidates in reply".to_string()))?;

        Ok(reply)
    }
}

fn build_chat_request(
    system_prompt: &str,
    history: &[ChatTurn],
    user_message: &str,
) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| Content {
            role: Some(turn.role.as_wire_str().to_string()),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        })
        .collect();

    contents.push(Content {
        role: Some("user".to_string()),
        parts: vec![Part {
            text: user_message.to_string(),
        }],
    });

    GenerateContentRequest {
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part {
                text: system_prompt.to_string(),
            }],
        }),
        contents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_maps_assistant_to_model_role() {
        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                text: "hello".to_string(),
            },
            ChatTurn {
                role: ChatRole::Assistant,
                text: "hi there".to_string(),
            },
        ];

        let request = build_chat_request("be helpful", &history, "how are you?");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][2]["role"], "user");
        assert_eq!(value["contents"][2]["parts"][0]["text"], "how are you?");
        assert_eq!(
            value["system_instruction"]["parts"][0]["text"],
            "be helpful"
        );
    }

    #[test]
    fn test_unconfigured_service_is_unavailable() {
        let service = GeminiService::new(reqwest::Client::new(), GeminiConfig::default());
        assert!(!service.is_available());
    }
}
