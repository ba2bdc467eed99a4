pub mod card;
pub mod contacts;
pub mod generation;
mod handlers;
pub mod stores;

use crate::contacts::ContactBook;
use crate::generation::Generator;
use crate::handlers::{
    delete_contact, get_contact, get_settings, import_contact, list_contacts, put_settings,
    reply_to_contact,
};
use crate::stores::KeyValueStore;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Upper bound for uploaded card files.
const MAX_CARD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub contacts: ContactBook,
    /// When unset, a client is built per request from the stored settings
    pub generator: Option<Arc<dyn Generator>>,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            contacts: ContactBook::new(store),
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }
}

pub fn init(router: Router<AppState>, state: AppState) -> Router<()> {
    router
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/contacts", get(list_contacts))
        .route(
            "/api/contacts/import",
            post(import_contact).layer(DefaultBodyLimit::max(MAX_CARD_BYTES)),
        )
        .route(
            "/api/contacts/{contact_id}",
            get(get_contact).delete(delete_contact),
        )
        .route("/api/contacts/{contact_id}/reply", post(reply_to_contact))
        .route("/api/settings", get(get_settings).put(put_settings))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
