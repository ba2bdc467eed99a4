use super::normalize_content_type;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::path::{Path, PathBuf};

const FALLBACK_MIME: &str = "application/octet-stream";

/// `data:<mime>;base64,<payload>` for the given bytes.
pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    let mime = normalize_content_type(content_type);
    let mime = if mime.is_empty() { FALLBACK_MIME } else { &mime };
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// A file handed to the card parser.
#[async_trait]
pub trait CardSource: Send + Sync {
    fn file_name(&self) -> &str;
    fn content_type(&self) -> &str;
    async fn read_bytes(&self) -> std::io::Result<Vec<u8>>;

    /// Text content; invalid UTF-8 sequences are replaced.
    async fn read_text(&self) -> std::io::Result<String> {
        let bytes = self.read_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn read_data_url(&self) -> std::io::Result<String> {
        let bytes = self.read_bytes().await?;
        Ok(data_url(self.content_type(), &bytes))
    }
}

/// A card already held in memory, e.g. a multipart upload.
#[derive(Clone, Debug)]
pub struct UploadedCard {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl UploadedCard {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[async_trait]
impl CardSource for UploadedCard {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// A card on disk. The content type is guessed from the extension.
#[derive(Clone, Debug)]
pub struct DiskCard {
    path: PathBuf,
    file_name: String,
    content_type: String,
}

impl DiskCard {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(&path)
            .first_raw()
            .unwrap_or_default()
            .to_string();
        Self {
            path,
            file_name,
            content_type,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

#[async_trait]
impl CardSource for DiskCard {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}
