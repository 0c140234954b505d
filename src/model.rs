// Domain Model - Contributions, Members, Payment Transactions
// Closed status enumerations with explicit transition rules

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// CONTRIBUTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContributionType {
    /// Recurring contribution, at most one per member per calendar month
    Monthly,
    /// Unconstrained, repeatable contribution
    Voluntary,
}

impl ContributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Monthly => "Monthly",
            ContributionType::Voluntary => "Voluntary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Monthly" => Some(ContributionType::Monthly),
            "Voluntary" => Some(ContributionType::Voluntary),
            _ => None,
        }
    }
}

// ============================================================================
// CONTRIBUTION STATUS
// ============================================================================

/// Contribution lifecycle. Allowed transitions:
/// Pending -> Confirmed | Failed | Invalid, Failed -> Pending (retry).
/// Rows are never deleted, only transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionStatus {
    Pending,
    Confirmed,
    Failed,
    Invalid,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "Pending",
            ContributionStatus::Confirmed => "Confirmed",
            ContributionStatus::Failed => "Failed",
            ContributionStatus::Invalid => "Invalid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(ContributionStatus::Pending),
            "Confirmed" => Some(ContributionStatus::Confirmed),
            "Failed" => Some(ContributionStatus::Failed),
            "Invalid" => Some(ContributionStatus::Invalid),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: ContributionStatus) -> bool {
        use ContributionStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Failed) | (Pending, Invalid) | (Failed, Pending)
        )
    }
}

// ============================================================================
// CONTRIBUTION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    /// Stable identity (UUID), assigned on insert
    pub id: String,
    pub member_id: String,
    pub contribution_type: ContributionType,
    pub amount: f64,
    pub contribution_date: NaiveDate,
    pub status: ContributionStatus,
    pub created_at: DateTime<Utc>,
}

impl Contribution {
    pub fn new(
        member_id: &str,
        contribution_type: ContributionType,
        amount: f64,
        contribution_date: NaiveDate,
    ) -> Self {
        Contribution {
            id: uuid::Uuid::new_v4().to_string(),
            member_id: member_id.to_string(),
            contribution_type,
            amount,
            contribution_date,
            status: ContributionStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    /// Calendar period this contribution falls in
    pub fn period(&self) -> (i32, u32) {
        (self.contribution_date.year(), self.contribution_date.month())
    }
}

// ============================================================================
// MEMBER
// ============================================================================

/// Member as consumed by this core: identity and activity only.
/// The full member profile is owned by the member-management collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub full_name: String,
    pub is_active: bool,
}

// ============================================================================
// PAYMENT TRANSACTION
// ============================================================================

/// Payment transaction lifecycle. Allowed transitions:
/// Pending -> Success | Failed, Failed -> Pending (retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Success => "Success",
            TransactionStatus::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(TransactionStatus::Pending),
            "Success" => Some(TransactionStatus::Success),
            "Failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Success) | (Pending, Failed) | (Failed, Pending)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: String,
    pub contribution_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    pub fn new(contribution_id: &str, status: TransactionStatus) -> Self {
        let now = Utc::now();
        PaymentTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            contribution_id: contribution_id.to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// DERIVED VIEWS
// ============================================================================

/// Derived eligibility decision - recomputed on demand, never persisted here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub member_id: String,
    pub is_eligible: bool,
    /// Distinct (year, month) pairs with a Monthly contribution
    pub distinct_months: u32,
    pub reason: String,
}

/// Read-only statement projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionStatement {
    pub member_id: String,
    pub total_contributions: f64,
    pub contributions: Vec<Contribution>,
}

// ============================================================================
// TESTS
// ============================================================================
