//! Persona handlers

use axum::extract::{Extension, Json, Path};
use std::sync::Arc;
use tracing::info;

use super::models::{CreatePersona, Persona, PersonaResponse};
use crate::auth::AuthedUser;
use crate::common::{generate_persona_id, ApiError, AppState};

/// GET /api/personas
pub async fn list_personas(
    Extension(state): Extension<Arc<AppState>>,
    _authed: AuthedUser,
) -> Result<Json<Vec<PersonaResponse>>, ApiError> {
    let personas: Vec<Persona> =
        sqlx::query_as("SELECT * FROM personas ORDER BY rowid ASC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(personas.iter().map(PersonaResponse::from).collect()))
}

/// GET /api/personas/{id}
pub async fn get_persona(
    Extension(state): Extension<Arc<AppState>>,
    _authed: AuthedUser,
    Path(persona_id): Path<String>,
) -> Result<Json<PersonaResponse>, ApiError> {
    let persona: Option<Persona> = sqlx::query_as("SELECT * FROM personas WHERE id = ?")
        .bind(&persona_id)
        .fetch_optional(&state.db)
        .await?;

    match persona {
        Some(p) => Ok(Json(PersonaResponse::from(&p))),
        None => Err(ApiError::NotFound("persona not found".to_string())),
    }
}

/// POST /api/personas (admin only)
pub async fn create_persona(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Json(payload): Json<CreatePersona>,
) -> Result<Json<PersonaResponse>, ApiError> {
    if !authed.is_admin {
        return Err(ApiError::Forbidden("admin scope required".to_string()));
    }

    if payload.name.trim().is_empty() {
        return Err(ApiError::ValidationError("name is required".to_string()));
    }
    if payload.system_prompt.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "system_prompt is required".to_string(),
        ));
    }

    let persona_id = generate_persona_id();

    sqlx::query(
        "INSERT INTO personas (id, name, description, system_prompt, profile_image_key, created_by_user_id) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&persona_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(&payload.system_prompt)
    .bind(&payload.profile_image_key)
    .bind(&authed.id)
    .execute(&state.db)
    .await?;

    let persona: Persona = sqlx::query_as("SELECT * FROM personas WHERE id = ?")
        .bind(&persona_id)
        .fetch_one(&state.db)
        .await?;

    info!(persona_id = %persona.id, created_by = %authed.id, "Persona created");

    Ok(Json(PersonaResponse::from(&persona)))
}
