//! Group creation

use serde::Deserialize;

use super::{FieldErrors, check_max_length, required_text};

pub const TITLE_MAX_LENGTH: usize = 30;
pub const DESCR_MAX_LENGTH: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl GroupForm {
    /// Check lengths and derive the slug. Whether the slug is already
    /// taken is decided by the caller against the database.
    pub fn validate(&self) -> Result<CleanGroup, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required_text(&mut errors, "title", &self.title);
        check_max_length(&mut errors, "title", &title, TITLE_MAX_LENGTH);

        let description = required_text(&mut errors, "description", &self.description);
        check_max_length(&mut errors, "description", &description, DESCR_MAX_LENGTH);

        let slug = slug::slugify(&title);
        if !title.is_empty() && slug.is_empty() {
            errors.add("title", "The title must contain letters or digits.");
        }

        errors.finish(CleanGroup {
            title,
            slug,
            description,
        })
    }
}
