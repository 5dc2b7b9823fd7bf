//! Public intake forms and the admin user form.
//!
//! Fields are plain strings so that missing or blank input surfaces as a
//! per-field validation message instead of a deserialization error. Both
//! `snake_case` and `camelCase` field names are accepted.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::Role;
use crate::crm::NewCrmUser;
use crate::error::AppError;
use crate::models::{InsuranceType, NewClientSubmission, NewQuoteRequest, PipelineStage};
use crate::validation::into_app_error;

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct ClientInfoForm {
    #[serde(alias = "firstName")]
    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "First name is required"
    ))]
    pub first_name: String,

    #[serde(alias = "lastName")]
    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "Last name is required"
    ))]
    pub last_name: String,

    #[validate(custom(function = "crate::validation::email_address"))]
    pub email: String,

    #[validate(custom(function = "crate::validation::phone_number"))]
    pub phone: String,

    #[serde(alias = "dateOfBirth", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,

    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "Address is required"
    ))]
    pub address: String,

    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "City is required"
    ))]
    pub city: String,

    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "State is required"
    ))]
    pub state: String,

    #[serde(alias = "zipCode")]
    #[validate(custom(function = "crate::validation::zip_code"))]
    pub zip_code: String,
}

impl ClientInfoForm {
    /// Validates the form and returns the trimmed record to insert.
    pub fn into_new(self) -> Result<NewClientSubmission, AppError> {
        self.validate().map_err(into_app_error)?;
        Ok(NewClientSubmission {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            date_of_birth: non_empty(self.date_of_birth),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            zip_code: self.zip_code.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct QuoteRequestForm {
    #[serde(alias = "fullName")]
    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "Full name is required"
    ))]
    pub full_name: String,

    #[validate(custom(function = "crate::validation::email_address"))]
    pub email: String,

    #[validate(custom(function = "crate::validation::phone_number"))]
    pub phone: String,

    /// One of `health`, `auto`, `life`, `property`, `business`.
    #[serde(alias = "insuranceType")]
    #[validate(custom(function = "crate::validation::insurance_type"))]
    pub insurance_type: String,

    #[serde(alias = "coverageAmount", skip_serializing_if = "Option::is_none")]
    pub coverage_amount: Option<String>,

    #[serde(alias = "additionalInfo", skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

impl QuoteRequestForm {
    /// Validates the form. New requests always enter the pipeline at
    /// `new_request`.
    pub fn into_new(self) -> Result<NewQuoteRequest, AppError> {
        self.validate().map_err(into_app_error)?;
        let insurance_type: InsuranceType = self
            .insurance_type
            .parse()
            .map_err(|_| AppError::invalid_field("insurance_type", "Please select an insurance type"))?;

        Ok(NewQuoteRequest {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            insurance_type,
            coverage_amount: non_empty(self.coverage_amount),
            additional_info: non_empty(self.additional_info),
            status: PipelineStage::NewRequest,
        })
    }
}

/// Admin form for adding a user to the directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct UserForm {
    #[validate(custom(function = "crate::validation::email_address"))]
    pub email: String,

    #[serde(alias = "fullName")]
    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "Full name is required"
    ))]
    pub full_name: String,

    #[validate(custom(function = "crate::validation::role"))]
    pub role: String,

    pub department: Option<String>,
    #[serde(alias = "jobTitle")]
    pub job_title: Option<String>,
    #[serde(alias = "employeeId")]
    pub employee_id: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "vendorCompanyName")]
    pub vendor_company_name: Option<String>,
    #[serde(alias = "vendorType")]
    pub vendor_type: Option<String>,
    pub timezone: Option<String>,
    #[serde(alias = "preferredLanguage")]
    pub preferred_language: Option<String>,
}

impl UserForm {
    pub fn into_new(self) -> Result<NewCrmUser, AppError> {
        self.validate().map_err(into_app_error)?;
        let role: Role = self
            .role
            .parse()
            .map_err(|_| AppError::invalid_field("role", "Please select a role"))?;

        let mut user = NewCrmUser::new(self.email.trim(), self.full_name.trim(), role);
        user.department = non_empty(self.department);
        user.job_title = non_empty(self.job_title);
        user.employee_id = non_empty(self.employee_id);
        user.phone = non_empty(self.phone);
        user.vendor_company_name = non_empty(self.vendor_company_name);
        user.vendor_type = non_empty(self.vendor_type);
        if let Some(tz) = non_empty(self.timezone) {
            user.timezone = tz;
        }
        if let Some(lang) = non_empty(self.preferred_language) {
            user.preferred_language = lang;
        }
        Ok(user.normalized())
    }
}
