//! Persona data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persona database model
///
/// A persona's system prompt steers the AI side of every conversation
/// opened against it.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub profile_image_key: Option<String>,
    pub created_by_user_id: Option<String>,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct CreatePersona {
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub profile_image_key: Option<String>,
}

/// Client-facing persona summary; the system prompt stays server-side
#[derive(Serialize)]
pub struct PersonaResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub profile_image_key: Option<String>,
    pub created_at: String,
}

impl From<&Persona> for PersonaResponse {
    fn from(persona: &Persona) -> Self {
        PersonaResponse {
            id: persona.id.clone(),
            name: persona.name.clone(),
            description: persona.description.clone(),
            profile_image_key: persona.profile_image_key.clone(),
            created_at: persona.created_at.clone(),
        }
    }
}
