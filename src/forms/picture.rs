//! Uploaded image checks

use base64::{Engine as _, engine::general_purpose};
use image::ImageFormat;

/// A file part received from a form or API body
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Upload {
    /// Browsers send an empty part when no file was chosen
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.filename.is_empty()
    }
}

/// An upload that decoded successfully as a supported image
#[derive(Debug, Clone)]
pub struct ValidImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ValidImage {
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Decode the upload fully; anything that is not a readable image fails.
pub fn validate_image(upload: &Upload) -> Result<ValidImage, image::ImageError> {
    let format = image::guess_format(&upload.data)?;
    let decoded = image::load_from_memory_with_format(&upload.data, format)?;

    Ok(ValidImage {
        data: upload.data.clone(),
        format,
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Image sent as base64 text in a JSON body
pub fn decode_base64_upload(raw: &str) -> Option<Upload> {
    let payload = match raw.split_once(";base64,") {
        Some((_, data)) => data,
        None => raw,
    };
    let data = general_purpose::STANDARD.decode(payload.trim()).ok()?;
    Some(Upload {
        filename: "upload".to_string(),
        content_type: None,
        data,
    })
}
