//! Signup and login forms

use serde::Deserialize;

use super::{FieldErrors, check_max_length, required_text};

const USERNAME_MAX_LENGTH: usize = 150;
const NAME_MAX_LENGTH: usize = 150;
const PASSWORD_MIN_LENGTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Validated signup; the password is still plain text here
#[derive(Debug, Clone)]
pub struct CleanSignup {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

impl SignupForm {
    pub fn validate(&self) -> Result<CleanSignup, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = required_text(&mut errors, "username", &self.username);
        check_max_length(&mut errors, "username", &username, USERNAME_MAX_LENGTH);
        if !username.chars().all(is_username_char) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        let first_name = self.first_name.trim().to_string();
        check_max_length(&mut errors, "first_name", &first_name, NAME_MAX_LENGTH);
        let last_name = self.last_name.trim().to_string();
        check_max_length(&mut errors, "last_name", &last_name, NAME_MAX_LENGTH);

        let email = self.email.trim().to_string();
        if !email.is_empty() && !email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", super::REQUIRED_MESSAGE);
        } else if self.password1.chars().count() < PASSWORD_MIN_LENGTH {
            errors.add(
                "password1",
                format!("This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."),
            );
        }
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.finish(CleanSignup {
            username,
            first_name,
            last_name,
            email,
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Where to go after logging in
    pub next: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = required_text(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", super::REQUIRED_MESSAGE);
        }
        errors.finish((username, self.password.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignupForm {
        SignupForm {
            username: "alice".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            email: "alice@example.com".to_string(),
            password1: "wonderland".to_string(),
            password2: "wonderland".to_string(),
        }
    }

    #[test]
    fn valid_signup() {
        let clean = signup().validate().unwrap();
        assert_eq!(clean.username, "alice");
        assert_eq!(clean.password, "wonderland");
    }

    #[test]
    fn username_charset() {
        let mut form = signup();
        form.username = "alice liddell".to_string();
        assert!(form.validate().unwrap_err().has("username"));

        form.username = "алиса".to_string();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn passwords_must_match_and_be_long_enough() {
        let mut form = signup();
        form.password2 = "wonderlanb".to_string();
        assert!(form.validate().unwrap_err().has("password2"));

        let mut form = signup();
        form.password1 = "short".to_string();
        form.password2 = "short".to_string();
        assert!(form.validate().unwrap_err().has("password1"));
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }
}
