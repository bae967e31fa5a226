//! Field checks applied after a body decodes. Format problems (dates, gender) are already
//! rejected by deserialization.

use crate::error::AppError;
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_EMAIL_LENGTH: usize = 254;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("email pattern compiles")
    })
}

pub struct RequestValidator;

impl RequestValidator {
    /// Non-blank and at most [`MAX_NAME_LENGTH`] characters.
    pub fn name(field: &str, value: &str) -> Result<(), AppError> {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} is required", field)));
        }
        if value.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                field, MAX_NAME_LENGTH
            )));
        }
        Ok(())
    }

    pub fn email(value: &str) -> Result<(), AppError> {
        if value.len() > MAX_EMAIL_LENGTH || !email_regex().is_match(value) {
            return Err(AppError::Validation("email must be a valid email".into()));
        }
        Ok(())
    }

    pub fn password(value: &str) -> Result<(), AppError> {
        if value.is_empty() {
            return Err(AppError::Validation("password is required".into()));
        }
        Ok(())
    }

    pub fn id(field: &str, value: i64) -> Result<(), AppError> {
        if value <= 0 {
            return Err(AppError::Validation(format!("{} must be a positive integer", field)));
        }
        Ok(())
    }
}
