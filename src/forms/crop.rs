//! Crop specification and the crop transform
//!
//! Checking a rectangle against image bounds is pure; cropping decodes
//! and re-encodes the image and may fail on its own.

use serde::Deserialize;
use std::io::Cursor;

use super::picture::ValidImage;

/// Client-supplied rectangle, as sent by the cropping widget
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CropSpec {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle in whole pixels, guaranteed to lie inside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropSpec {
    /// Parse the hidden `crop_data` JSON payload
    pub fn parse(raw: &str) -> Result<Self, String> {
        let spec: CropSpec = serde_json::from_str(raw)
            .map_err(|_| "Invalid crop data: expected {x, y, width, height}.".to_string())?;
        let values = [spec.x, spec.y, spec.width, spec.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("Invalid crop data: coordinates must be numbers.".to_string());
        }
        Ok(spec)
    }

    /// Round to pixels and check the rectangle `(x, y, x+width, y+height)`
    /// against an image of `image_width` x `image_height`.
    pub fn within(&self, image_width: u32, image_height: u32) -> Result<CropRect, String> {
        let x = self.x.round();
        let y = self.y.round();
        let width = self.width.round();
        let height = self.height.round();

        if x < 0.0 || y < 0.0 {
            return Err("Crop area must start inside the image.".to_string());
        }
        if width < 1.0 || height < 1.0 {
            return Err("Crop area must not be empty.".to_string());
        }
        if x + width > f64::from(image_width) || y + height > f64::from(image_height) {
            return Err("Crop area must lie within the image.".to_string());
        }

        Ok(CropRect {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Cut `rect` out of `source`, keeping its format
pub fn crop_image(source: &ValidImage, rect: CropRect) -> Result<ValidImage, image::ImageError> {
    let decoded = image::load_from_memory_with_format(&source.data, source.format)?;
    let cropped = decoded.crop_imm(rect.x, rect.y, rect.width, rect.height);

    let mut buffer = Cursor::new(Vec::new());
    cropped.write_to(&mut buffer, source.format)?;

    Ok(ValidImage {
        data: buffer.into_inner(),
        format: source.format,
        width: cropped.width(),
        height: cropped.height(),
    })
}
