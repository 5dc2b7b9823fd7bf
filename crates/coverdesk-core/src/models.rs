use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line of insurance a quote request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum InsuranceType {
    Health,
    Auto,
    Life,
    Property,
    Business,
}

impl InsuranceType {
    pub const ALL: [InsuranceType; 5] = [
        InsuranceType::Health,
        InsuranceType::Auto,
        InsuranceType::Life,
        InsuranceType::Property,
        InsuranceType::Business,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceType::Health => "health",
            InsuranceType::Auto => "auto",
            InsuranceType::Life => "life",
            InsuranceType::Property => "property",
            InsuranceType::Business => "business",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InsuranceType::Health => "Health Insurance",
            InsuranceType::Auto => "Auto Insurance",
            InsuranceType::Life => "Life Insurance",
            InsuranceType::Property => "Property Insurance",
            InsuranceType::Business => "Business Insurance",
        }
    }
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsuranceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "health" => Ok(InsuranceType::Health),
            "auto" => Ok(InsuranceType::Auto),
            "life" => Ok(InsuranceType::Life),
            "property" => Ok(InsuranceType::Property),
            "business" => Ok(InsuranceType::Business),
            _ => Err(format!("Unknown insurance type: {s}")),
        }
    }
}

/// Stage of a lead in the sales pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    NewRequest,
    Contacted,
    Quoted,
    ClosedWon,
    ClosedLost,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 5] = [
        PipelineStage::NewRequest,
        PipelineStage::Contacted,
        PipelineStage::Quoted,
        PipelineStage::ClosedWon,
        PipelineStage::ClosedLost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::NewRequest => "new_request",
            PipelineStage::Contacted => "contacted",
            PipelineStage::Quoted => "quoted",
            PipelineStage::ClosedWon => "closed_won",
            PipelineStage::ClosedLost => "closed_lost",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineStage::NewRequest => "New Request",
            PipelineStage::Contacted => "Contacted",
            PipelineStage::Quoted => "Quoted",
            PipelineStage::ClosedWon => "Closed Won",
            PipelineStage::ClosedLost => "Closed Lost",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PipelineStage::ClosedWon | PipelineStage::ClosedLost)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new_request" => Ok(PipelineStage::NewRequest),
            "contacted" => Ok(PipelineStage::Contacted),
            "quoted" => Ok(PipelineStage::Quoted),
            "closed_won" => Ok(PipelineStage::ClosedWon),
            "closed_lost" => Ok(PipelineStage::ClosedLost),
            _ => Err(format!("Unknown pipeline stage: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// Contact details captured by the public client-info form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClientSubmission {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub submitted_at: DateTime<Utc>,
}

impl ClientSubmission {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// DTO for inserting a client submission. The backend assigns `id` and
/// `submitted_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewClientSubmission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// A request for an insurance quote from the public quote form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QuoteRequest {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub insurance_type: InsuranceType,
    #[serde(default)]
    pub coverage_amount: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub status: PipelineStage,
    pub submitted_at: DateTime<Utc>,
}

/// DTO for inserting a quote request.
#[derive(Debug, Clone, Serialize)]
pub struct NewQuoteRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub insurance_type: InsuranceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    pub status: PipelineStage,
}

/// Both submission collections, as shown by the submissions viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Submissions {
    pub client_submissions: Vec<ClientSubmission>,
    pub quote_requests: Vec<QuoteRequest>,
}
