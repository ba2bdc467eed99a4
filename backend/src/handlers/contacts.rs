use super::store_status;
use crate::AppState;
use crate::card::{CardError, UploadedCard, parse_character_card};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use shared::models::Contact;
use tracing::{info, warn};
use uuid::Uuid;

const CARD_FIELD: &str = "file";

pub async fn list_contacts(State(state): State<AppState>) -> Result<Json<Vec<Contact>>, StatusCode> {
    let contacts = state
        .contacts
        .list()
        .await
        .map_err(|e| store_status("list contacts", e))?;
    Ok(Json(contacts))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Contact>, StatusCode> {
    let contact = state
        .contacts
        .get(contact_id)
        .await
        .map_err(|e| store_status("get contact", e))?;
    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<()>, StatusCode> {
    state
        .contacts
        .remove(contact_id)
        .await
        .map_err(|e| store_status("delete contact", e))?;
    Ok(Json(()))
}

/// Import a character card uploaded as the multipart field `file`.
pub async fn import_contact(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Contact>, (StatusCode, String)> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some(CARD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        upload = Some(UploadedCard::new(file_name, content_type, bytes.to_vec()));
        break;
    }
    let Some(upload) = upload else {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Missing multipart field `{}`", CARD_FIELD),
        ));
    };

    let character = match parse_character_card(&upload).await {
        Ok(Some(character)) => character,
        Ok(None) => {
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "No character data found in this file".to_string(),
            ));
        }
        Err(CardError::Io(e)) => {
            tracing::error!("Failed to read uploaded card: {:?}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
        Err(e) => {
            warn!("Rejected character card: {}", e);
            return Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
        }
    };

    let contact = state.contacts.add(character).await.map_err(|e| {
        tracing::error!("Failed to save imported contact: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    info!("Imported contact {} ({})", contact.name, contact.id);
    Ok(Json(contact))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::card::test_support::{chara_chunk, chunk, png};
    use crate::card::{DEFAULT_AVATAR, data_url};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use shared::models::Contact;

    const BOUNDARY: &str = "phone-shell-boundary";

    fn upload(file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/contacts/import")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn imports_png_card_and_lists_it() {
        let app = app(state());
        let bytes = png(&[chara_chunk(r#"{"data":{"name":"Aya","description":"Barista"}}"#)]);

        let response = send(&app, upload("aya.png", "image/png", &bytes)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let contact: Contact = body_json(response).await;
        assert_eq!(contact.name, "Aya");
        assert_eq!(contact.description, "Barista");
        assert_eq!(contact.avatar, data_url("image/png", &bytes));

        let response = send(&app, empty_request("GET", "/api/contacts")).await;
        let contacts: Vec<Contact> = body_json(response).await;
        assert_eq!(contacts, [contact.clone()]);

        let response = send(
            &app,
            empty_request("GET", &format!("/api/contacts/{}", contact.id)),
        )
        .await;
        assert_eq!(body_json::<Contact>(response).await, contact);
    }

    #[tokio::test]
    async fn imports_cards_larger_than_default_body_limit() {
        let app = app(state());
        let pixels = vec![0u8; 3 * 1024 * 1024];
        let bytes = png(&[
            chara_chunk(r#"{"name":"Aya","description":"High-res"}"#),
            chunk(b"IDAT", &pixels),
        ]);

        let response = send(&app, upload("aya-4k.png", "image/png", &bytes)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let contact: Contact = body_json(response).await;
        assert_eq!(contact.name, "Aya");
        assert_eq!(contact.avatar, data_url("image/png", &bytes));
    }

    #[tokio::test]
    async fn imports_json_card() {
        let app = app(state());
        let response = send(
            &app,
            upload("rin.json", "application/json", br#"{"persona":"Librarian"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let contact: Contact = body_json(response).await;
        assert_eq!(contact.name, "Unknown");
        assert_eq!(contact.description, "Librarian");
        assert_eq!(contact.avatar, DEFAULT_AVATAR);
    }

    #[tokio::test]
    async fn plain_png_imports_as_image_only_contact() {
        let app = app(state());
        let response = send(&app, upload("Selfie.png", "image/png", &png(&[]))).await;
        let contact: Contact = body_json(response).await;
        assert_eq!(contact.name, "Selfie");
        assert_eq!(contact.description, "");
    }

    #[tokio::test]
    async fn rejects_unsupported_and_malformed_cards() {
        let app = app(state());

        let response = send(&app, upload("notes.txt", "text/plain", b"hello")).await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = send(&app, upload("bad.json", "application/json", b"{oops")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = send(&app, upload("fake.png", "image/png", b"GIF89a....")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = send(&app, empty_request("GET", "/api/contacts")).await;
        assert!(body_json::<Vec<Contact>>(response).await.is_empty());
    }

    #[tokio::test]
    async fn delete_contact_then_not_found() {
        let app = app(state());
        let response = send(&app, upload("Selfie.png", "image/png", &png(&[]))).await;
        let contact: Contact = body_json(response).await;
        let uri = format!("/api/contacts/{}", contact.id);

        let response = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, empty_request("GET", &uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
