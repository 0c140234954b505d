// Pension Contribution Engine - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod eligibility;
pub mod error;
pub mod jobs;
pub mod ledger;
pub mod model;
pub mod statement;
pub mod store;
pub mod validate;

// Re-export commonly used types
pub use eligibility::{check_eligibility, MIN_CONTRIBUTION_MONTHS};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use jobs::{run_eligibility_job, run_failed_transaction_job, run_validation_job, JobReport};
pub use ledger::{add_monthly, add_voluntary};
pub use model::{
    Contribution, ContributionStatement, ContributionStatus, ContributionType, EligibilityResult,
    Member, PaymentTransaction, TransactionStatus,
};
pub use statement::build_statement;
pub use store::{
    contribution_count, contributions_by_member, find_member, insert_member, setup_database,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
