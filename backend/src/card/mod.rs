//! Character card import.
//!
//! A card is either a JSON document or a PNG image carrying the same JSON,
//! Base64-encoded, in a `tEXt` chunk with the keyword `chara`.

mod json;
mod png;
mod source;

pub use json::{CharacterFields, DEFAULT_AVATAR, UNKNOWN_NAME, parse_json_card};
pub use png::{PNG_SIGNATURE, file_stem, find_chara_payload, parse_png_card};
pub use source::{CardSource, DiskCard, UploadedCard, data_url};

use shared::models::ParsedCharacter;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("File is not a valid PNG image")]
    InvalidFormat,
    #[error("Malformed character JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("Failed to read card file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardFormat {
    Json,
    Png,
}

impl CardFormat {
    /// Pick a parser from the declared content type. A `.json` file with no
    /// useful content type is still treated as a JSON card.
    pub fn detect(content_type: &str, file_name: &str) -> Option<Self> {
        match normalize_content_type(content_type).as_str() {
            "application/json" => Some(Self::Json),
            "image/png" => Some(Self::Png),
            "" | "application/octet-stream" if has_json_extension(file_name) => Some(Self::Json),
            _ => None,
        }
    }
}

/// Lowercased MIME type without parameters (`Application/JSON; charset=utf-8` -> `application/json`).
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn has_json_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("json"))
}

/// Parse an uploaded character card.
///
/// Returns `Ok(None)` for content types that cannot carry a card. Fails with
/// [`CardError::MalformedJson`] when a JSON card does not parse and with
/// [`CardError::InvalidFormat`] when a PNG card has a bad signature.
pub async fn parse_character_card<S>(source: &S) -> Result<Option<ParsedCharacter>, CardError>
where
    S: CardSource + ?Sized,
{
    let Some(format) = CardFormat::detect(source.content_type(), source.file_name()) else {
        debug!(
            "Unsupported card type {:?} for {}",
            source.content_type(),
            source.file_name()
        );
        return Ok(None);
    };

    match format {
        CardFormat::Json => {
            let text = source.read_text().await?;
            parse_json_card(&text).map(Some)
        }
        CardFormat::Png => {
            // Both reads are independent views of the same immutable file
            let (bytes, avatar) = tokio::join!(source.read_bytes(), source.read_data_url());
            parse_png_card(&bytes?, source.file_name(), avatar?).map(Some)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

    pub fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 12);
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        // CRC is never checked by the parser
        out.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        out
    }

    pub fn text_chunk(keyword: &str, value: &[u8]) -> Vec<u8> {
        let mut data = keyword.as_bytes().to_vec();
        data.push(0);
        data.extend_from_slice(value);
        chunk(b"tEXt", &data)
    }

    pub fn chara_chunk(json: &str) -> Vec<u8> {
        text_chunk("chara", BASE64.encode(json).as_bytes())
    }

    pub fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = super::PNG_SIGNATURE.to_vec();
        out.extend(chunk(b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]));
        for c in chunks {
            out.extend_from_slice(c);
        }
        out.extend(chunk(b"IDAT", &[0x78, 0x9C, 0x63, 0x00, 0x00]));
        out.extend(chunk(b"IEND", &[]));
        out
    }
}
