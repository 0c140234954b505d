// Error Taxonomy
// Every fallible operation returns a tagged variant with a stable code,
// never a raw unhandled failure. "Not eligible" is a successful result
// carried by EligibilityResult, not an error.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("contribution amount must be greater than zero (got {amount})")]
    InvalidAmount { amount: f64 },

    #[error("contribution date {date} cannot be in the future")]
    FutureDate { date: NaiveDate },

    #[error("a monthly contribution already exists for member {member_id} in {year}-{month:02}")]
    DuplicatePeriod {
        member_id: String,
        year: i32,
        month: u32,
    },

    #[error("no member found with ID {member_id}")]
    UnknownMember { member_id: String },

    #[error("no contributions found for member ID {member_id}")]
    NoContributions { member_id: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Broad classification used by callers that branch on error class
/// (retry policy, HTTP status) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Persistence,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidAmount { .. } | EngineError::FutureDate { .. } => {
                ErrorKind::Validation
            }
            EngineError::DuplicatePeriod { .. } => ErrorKind::Conflict,
            EngineError::UnknownMember { .. } | EngineError::NoContributions { .. } => {
                ErrorKind::NotFound
            }
            EngineError::Storage(_) => ErrorKind::Persistence,
        }
    }

    /// Stable machine-readable code, independent of the display message
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidAmount { .. } => "INVALID_AMOUNT",
            EngineError::FutureDate { .. } => "FUTURE_DATE",
            EngineError::DuplicatePeriod { .. } => "DUPLICATE_PERIOD",
            EngineError::UnknownMember { .. } => "UNKNOWN_MEMBER",
            EngineError::NoContributions { .. } => "NO_CONTRIBUTIONS",
            EngineError::Storage(_) => "STORAGE",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
