use super::store_status;
use crate::AppState;
use crate::generation::{
    GenerationError, Generator, OpenAiGenerator, build_system_prompt, parse_reply,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::models::{ChatTurn, ReplyRequest, ReplyResponse};
use std::sync::Arc;
use uuid::Uuid;

fn generation_status(e: GenerationError) -> StatusCode {
    match e {
        GenerationError::MissingApiKey => StatusCode::UNAUTHORIZED,
        e => {
            tracing::error!("Generation failed: {:?}", e);
            StatusCode::BAD_GATEWAY
        }
    }
}

/// Ask the generator to answer `payload.message` in the contact's persona.
pub async fn reply_to_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
    Json(payload): Json<ReplyRequest>,
) -> Result<Json<ReplyResponse>, StatusCode> {
    let contact = state
        .contacts
        .get(contact_id)
        .await
        .map_err(|e| store_status("get contact", e))?;

    let generator: Arc<dyn Generator> = match &state.generator {
        Some(generator) => generator.clone(),
        None => {
            let settings = state
                .contacts
                .settings()
                .await
                .map_err(|e| store_status("load settings", e))?;
            Arc::new(OpenAiGenerator::from_settings(settings).map_err(generation_status)?)
        }
    };

    let mut history = payload.history;
    history.push(ChatTurn::user(payload.message));
    let raw = generator
        .generate(&build_system_prompt(&contact), &history)
        .await
        .map_err(generation_status)?;

    Ok(Json(ReplyResponse {
        messages: parse_reply(&raw),
    }))
}
