pub mod contacts;
pub mod reply;
pub mod settings;

pub use contacts::*;
pub use reply::*;
pub use settings::*;

use crate::stores::StoreError;
use axum::http::StatusCode;

fn store_status(context: &str, e: StoreError) -> StatusCode {
    if matches!(e, StoreError::NotFound(_)) {
        return StatusCode::NOT_FOUND;
    }
    tracing::error!("Failed to {}: {:?}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}
