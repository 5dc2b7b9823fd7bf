pub mod auth;
pub mod crm;
pub mod error;
pub mod forms;
pub mod memory;
pub mod models;
pub mod pagination;
pub mod session;
pub mod stats;
pub mod traits;
pub mod util;
pub mod validation;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use auth::{AuthChange, AuthEvent, AuthUser, Role, Session};
pub use error::AppError;
pub use forms::{ClientInfoForm, QuoteRequestForm, UserForm};
pub use memory::MemoryStore;
pub use models::{
    ClientSubmission, InsuranceType, NewClientSubmission, NewQuoteRequest, PipelineStage,
    QuoteRequest, Submissions,
};
pub use session::{
    ActivityHandle, ActivitySignal, SessionConfig, SessionGuard, SessionNotice, SessionState,
};
pub use stats::DashboardStats;
pub use traits::{AuthBackend, CrmStore, IdentityLookup, SubmissionStore};
