//! Form validation
//!
//! Each submission type (post, comment, group, signup, login) has a strict
//! input struct and a `validate` function returning either the cleaned
//! value or a [`FieldErrors`] map that is re-rendered next to the form.
//! Nothing in here touches the database; lookups the validation needs
//! (available groups) are passed in.

mod comment;
mod crop;
mod group;
pub(crate) mod picture;
mod post;
mod user;

use serde::Serialize;
use std::collections::BTreeMap;

pub use comment::CommentForm;
pub use crop::{CropRect, CropSpec, crop_image};
pub use group::{CleanGroup, DESCR_MAX_LENGTH, GroupForm, TITLE_MAX_LENGTH};
pub use picture::{Upload, ValidImage, decode_base64_upload, validate_image};
pub use post::{CleanPost, PostForm};
pub use user::{CleanSignup, LoginForm, SignupForm};

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_IMAGE_MESSAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const GROUP_EXISTS_MESSAGE: &str = "A group with this title already exists!";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Field name to list of messages. `__all__` holds form-wide errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(value)` when no errors were collected
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Trimmed required text; records the required message when blank
pub(crate) fn required_text(errors: &mut FieldErrors, field: &str, raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED_MESSAGE);
    }
    value.to_string()
}

/// Records a max-length message when `value` is longer than `max` characters
pub(crate) fn check_max_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_and_render() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());
        errors.add("text", REQUIRED_MESSAGE);
        errors.add("image", INVALID_IMAGE_MESSAGE);

        assert!(errors.has("text"));
        assert_eq!(errors.get("text"), &[REQUIRED_MESSAGE.to_string()]);
        assert!(errors.get("group").is_empty());
        assert!(errors.to_string().contains("text: This field is required."));

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["text"][0], REQUIRED_MESSAGE);
    }

    #[test]
    fn max_length_counts_characters() {
        let mut errors = FieldErrors::new();
        check_max_length(&mut errors, "title", "ёжик", 4);
        assert!(errors.is_empty());
        check_max_length(&mut errors, "title", "ёжики", 4);
        assert_eq!(
            errors.get("title"),
            &["Ensure this value has at most 4 characters (it has 5).".to_string()]
        );
    }
}
