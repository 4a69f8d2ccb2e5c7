//! Post submission

use super::crop::{CropRect, CropSpec, crop_image};
use super::picture::{Upload, ValidImage, validate_image};
use super::{FieldErrors, INVALID_CHOICE_MESSAGE, INVALID_IMAGE_MESSAGE, required_text};
use crate::data::Group;

/// Raw post form as submitted (multipart)
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Selected group id, empty for none
    pub group: Option<String>,
    pub image: Option<Upload>,
    /// Hidden JSON `{x, y, width, height}` from the cropping widget
    pub crop_data: Option<String>,
}

/// A validated post submission. The crop, if any, has been checked
/// against the image bounds but not applied yet.
#[derive(Debug, Clone)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ValidImage>,
    pub crop: Option<CropRect>,
}

impl PostForm {
    pub fn validate(&self, groups: &[Group]) -> Result<CleanPost, FieldErrors> {
        let mut errors = FieldErrors::new();

        let text = required_text(&mut errors, "text", &self.text);

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE_MESSAGE);
                    None
                }
            },
        };

        let image = match self.image.as_ref().filter(|upload| !upload.is_empty()) {
            None => None,
            Some(upload) => match validate_image(upload) {
                Ok(image) => Some(image),
                Err(error) => {
                    tracing::debug!(%error, filename = %upload.filename, "Rejected image upload");
                    errors.add("image", INVALID_IMAGE_MESSAGE);
                    None
                }
            },
        };

        let crop_raw = self.crop_data.as_deref().map(str::trim).unwrap_or("");
        let crop = match (&image, crop_raw.is_empty()) {
            (Some(image), false) => {
                match CropSpec::parse(crop_raw).and_then(|spec| spec.within(image.width, image.height)) {
                    Ok(rect) => Some(rect),
                    Err(message) => {
                        errors.add("crop_data", message);
                        None
                    }
                }
            }
            _ => None,
        };

        errors.finish(CleanPost {
            text,
            group_id,
            image,
            crop,
        })
    }
}

impl CleanPost {
    /// Run the crop transform; a failure is reported against the image field.
    pub fn apply_crop(mut self) -> Result<CleanPost, FieldErrors> {
        let Some(rect) = self.crop else {
            return Ok(self);
        };
        let Some(image) = self.image.as_ref() else {
            return Ok(self);
        };

        match crop_image(image, rect) {
            Ok(cropped) => {
                self.image = Some(cropped);
                self.crop = None;
                Ok(self)
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to crop uploaded image");
                Err(FieldErrors::single("image", INVALID_IMAGE_MESSAGE))
            }
        }
    }
}
