//! Attachment upload requests, fetch URLs and the image heuristic.
//!
//! Keys are opaque strings owned by the file store. Nothing here inspects
//! file contents; whether a key "is an image" is decided from its suffix.

use crate::client::parse_json;
use crate::error::ApiError;
use crate::http::{FilePart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::types::UploadedFile;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];
const UPLOAD_FIELD: &str = "file";

/// Maps attachment keys to upload requests and fetchable URLs.
#[derive(Debug, Clone)]
pub struct AttachmentResolver {
    base_url: String,
}

impl AttachmentResolver {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Single multipart request carrying the whole file.
    pub fn build_upload(&self, file_name: &str, bytes: Vec<u8>) -> HttpRequest {
        let content_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string();
        HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/api/files/", self.base_url),
            headers: Vec::new(),
            body: Some(RequestBody::Multipart(FilePart {
                field: UPLOAD_FIELD.to_string(),
                file_name: file_name.to_string(),
                content_type,
                bytes,
            })),
        }
    }

    /// Returns the key assigned by the file store.
    pub fn parse_upload(&self, response: HttpResponse) -> Result<String, ApiError> {
        let uploaded: UploadedFile = parse_json(&response)?;
        Ok(uploaded.key)
    }

    /// URL the rendering layer fetches the attachment from.
    ///
    /// `None` for an absent or empty key. With an empty base URL the result is
    /// a same-origin relative path.
    pub fn resolve_url(&self, key: Option<&str>) -> Option<String> {
        let key = key.filter(|key| !key.is_empty())?;
        Some(format!(
            "{}/api/files/{}",
            self.base_url,
            urlencoding::encode(key)
        ))
    }
}

/// True when the key ends in a known raster image extension (any case).
pub fn is_image_key(key: &str) -> bool {
    let Some((_, extension)) = key.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(extension))
}
