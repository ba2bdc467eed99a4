use super::store_status;
use crate::AppState;
use axum::{Json, extract::State, http::StatusCode};
use shared::models::AppSettings;

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<AppSettings>, StatusCode> {
    let settings = state
        .contacts
        .settings()
        .await
        .map_err(|e| store_status("load settings", e))?;
    Ok(Json(settings))
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(payload): Json<AppSettings>,
) -> Result<Json<AppSettings>, StatusCode> {
    state
        .contacts
        .save_settings(&payload)
        .await
        .map_err(|e| store_status("save settings", e))?;
    Ok(Json(payload))
}
