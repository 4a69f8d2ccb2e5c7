//! Comment submission

use serde::Deserialize;

use super::{FieldErrors, required_text};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    /// Cleaned comment text
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let text = required_text(&mut errors, "text", &self.text);
        errors.finish(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_comment_is_rejected() {
        let form = CommentForm {
            text: "\n\t ".to_string(),
        };
        assert!(form.validate().unwrap_err().has("text"));
    }

    #[test]
    fn comment_is_trimmed() {
        let form = CommentForm {
            text: "  nice post ".to_string(),
        };
        assert_eq!(form.validate().unwrap(), "nice post");
    }
}
