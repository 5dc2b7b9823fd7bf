//! Field rules shared by the public intake forms.
//!
//! The functions here plug into `#[validate(custom(...))]` on form structs;
//! [`into_app_error`] flattens the collected errors into an
//! [`AppError::ValidationError`].

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{ValidateEmail, ValidationError, ValidationErrors};

use crate::error::AppError;
use crate::auth::Role;
use crate::models::InsuranceType;

pub const VALIDATION_SUMMARY: &str = "Please fill in all required fields correctly";

/// Minimum number of digits in a phone number.
const MIN_PHONE_DIGITS: usize = 10;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Rejects empty and whitespace-only values.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(failure("required", "This field is required"));
    }
    Ok(())
}

pub fn email_address(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(failure("required", "Email is required"));
    }
    if value.contains(char::is_whitespace) || !value.validate_email() {
        return Err(failure("email", "Please enter a valid email"));
    }
    Ok(())
}

/// Digits, spaces, dashes and parentheses, with at least ten digits.
pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(failure("required", "Phone number is required"));
    }

    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    let digits = value.chars().filter(char::is_ascii_digit).count();

    if !allowed || digits < MIN_PHONE_DIGITS {
        return Err(failure("phone", "Please enter a valid phone number"));
    }
    Ok(())
}

/// US ZIP code: `12345` or `12345-6789`.
pub fn zip_code(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(failure("required", "ZIP code is required"));
    }

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let valid = match value.split_once('-') {
        None => value.len() == 5 && all_digits(value),
        Some((base, ext)) => {
            base.len() == 5 && all_digits(base) && ext.len() == 4 && all_digits(ext)
        }
    };

    if !valid {
        return Err(failure("zip", "Please enter a valid ZIP code"));
    }
    Ok(())
}

pub fn insurance_type(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.parse::<InsuranceType>().is_err() {
        return Err(failure(
            "insurance_type",
            "Please select an insurance type",
        ));
    }
    Ok(())
}

pub fn role(value: &str) -> Result<(), ValidationError> {
    if value.parse::<Role>().is_err() {
        return Err(failure("role", "Please select a role"));
    }
    Ok(())
}

/// Flatten `validator` errors into field errors, sorted by field name.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| FieldError {
                field: field.to_string(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}")),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

pub fn into_app_error(errors: ValidationErrors) -> AppError {
    AppError::ValidationError {
        message: VALIDATION_SUMMARY.to_string(),
        fields: field_errors(&errors),
    }
}
