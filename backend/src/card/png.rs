use super::CardError;
use super::json::CharacterFields;
use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde_json::Value;
use shared::models::ParsedCharacter;
use thiserror::Error;
use tracing::{debug, warn};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const CHARA_KEYWORD: &str = "chara";
const CRC_LEN: usize = 4;

// Card writers disagree on padding and line wrapping
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Why a `chara` chunk could not be used. Never surfaced to callers.
#[derive(Error, Debug)]
enum ChunkError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON root is not an object")]
    NotAnObject,
}

struct Chunk<'a> {
    kind: [u8; 4],
    data: &'a [u8],
}

/// Bounds-checked reader over the chunk stream that follows the signature.
struct ChunkReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_slice(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn read_array(&mut self) -> Option<[u8; 4]> {
        self.read_slice(4)?.try_into().ok()
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    fn skip(&mut self, len: usize) {
        self.pos = self.pos.saturating_add(len).min(self.bytes.len());
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Chunk<'a>;

    /// Yields chunks until the buffer runs out. A chunk whose declared
    /// length overruns the buffer ends the stream.
    fn next(&mut self) -> Option<Chunk<'a>> {
        let length = usize::try_from(self.read_u32()?).ok()?;
        let kind = self.read_array()?;
        let data = self.read_slice(length)?;
        self.skip(CRC_LEN);
        Some(Chunk { kind, data })
    }
}

/// One byte per char: tEXt chunks are Latin-1.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

fn text_entry(data: &[u8]) -> Option<(String, String)> {
    let nul = data.iter().position(|&b| b == 0)?;
    Some((latin1(&data[..nul]), latin1(&data[nul + 1..])))
}

fn decode_chara(value: &str) -> Result<Value, ChunkError> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let raw = LENIENT_BASE64.decode(cleaned.as_bytes())?;
    let text = String::from_utf8(raw)?;
    match serde_json::from_str(&text)? {
        value @ Value::Object(_) => Ok(value),
        _ => Err(ChunkError::NotAnObject),
    }
}

/// Scan a PNG for the first decodable `chara` text chunk.
///
/// Only a bad signature is fatal. Undecodable `chara` chunks are skipped and
/// the scan stops at `IEND` or at the end of the readable data.
pub fn find_chara_payload(bytes: &[u8]) -> Result<Option<Value>, CardError> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(CardError::InvalidFormat);
    }

    for chunk in ChunkReader::new(&bytes[PNG_SIGNATURE.len()..]) {
        match &chunk.kind {
            b"IEND" => break,
            b"tEXt" => {
                let Some((keyword, value)) = text_entry(chunk.data) else {
                    debug!("Skipping tEXt chunk without keyword separator");
                    continue;
                };
                if keyword != CHARA_KEYWORD {
                    continue;
                }
                match decode_chara(&value) {
                    Ok(json) => return Ok(Some(json)),
                    Err(e) => warn!("Skipping unreadable chara chunk: {}", e),
                }
            }
            _ => {}
        }
    }

    Ok(None)
}

/// File name without directories and without its last extension.
pub fn file_stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Parse a PNG card. `avatar` is the data-URL of the very same bytes and is
/// attached whether or not character metadata was found.
pub fn parse_png_card(
    bytes: &[u8],
    file_name: &str,
    avatar: String,
) -> Result<ParsedCharacter, CardError> {
    match find_chara_payload(bytes)? {
        Some(value) => Ok(CharacterFields::from_value(&value).into_character(avatar)),
        None => {
            debug!("No character data in {}, importing as plain image", file_name);
            Ok(ParsedCharacter {
                name: file_stem(file_name),
                description: String::new(),
                avatar,
            })
        }
    }
}
