//! Image payloads handed to the extractor.

use std::path::Path;

use base64::Engine;

use super::ExtractionError;
use crate::sanitize;

/// An image ready for extraction: raw bytes plus MIME type.
///
/// Only `image/*` payloads can be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    bytes: Vec<u8>,
    mime_type: String,
    reference: String,
}

impl CapturedImage {
    /// Wraps in-memory bytes. `reference` is an opaque label kept on the
    /// resulting candidate (for example the file name).
    pub fn from_bytes(
        bytes: Vec<u8>,
        mime_type: &str,
        reference: impl Into<String>,
    ) -> Result<Self, ExtractionError> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(ExtractionError::UnsupportedImage { mime_type });
        }
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyImage);
        }
        Ok(Self {
            bytes,
            mime_type,
            reference: reference.into(),
        })
    }

    /// Reads an image file, guessing the MIME type from its extension.
    pub async fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !mime_type.starts_with("image/") {
            return Err(ExtractionError::UnsupportedImage { mime_type });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::ReadImage {
                path: path.to_path_buf(),
                source: e,
            })?;

        Self::from_bytes(bytes, &mime_type, sanitize::redact_path(path))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Standard base64 encoding of the bytes, as sent inline to the model.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}
