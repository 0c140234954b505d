// Eligibility Evaluator
// A pure function of the stored contribution history: no mutation, no
// caching, safe to call repeatedly and concurrently for the same member.

use rusqlite::Connection;
use std::collections::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::model::{ContributionType, EligibilityResult};
use crate::store;

/// Minimum number of distinct contribution months for benefit eligibility
/// (one year of monthly contributions).
pub const MIN_CONTRIBUTION_MONTHS: u32 = 12;

/// Decide whether a member qualifies for benefits.
///
/// Counts the distinct (year, month) pairs covered by Monthly contributions,
/// not the raw contribution count: duplicate corrections within one month
/// never inflate eligibility. Voluntary contributions do not count.
pub fn check_eligibility(conn: &Connection, member_id: &str) -> EngineResult<EligibilityResult> {
    let contributions = store::contributions_by_member(conn, member_id)?;

    if contributions.is_empty() {
        return Err(EngineError::NoContributions {
            member_id: member_id.to_string(),
        });
    }

    let months: HashSet<(i32, u32)> = contributions
        .iter()
        .filter(|c| c.contribution_type == ContributionType::Monthly)
        .map(|c| c.period())
        .collect();

    let distinct_months = months.len() as u32;
    let is_eligible = distinct_months >= MIN_CONTRIBUTION_MONTHS;

    let reason = if is_eligible {
        format!(
            "member has monthly contributions in {} distinct months (minimum {})",
            distinct_months, MIN_CONTRIBUTION_MONTHS
        )
    } else {
        format!(
            "member has monthly contributions in {} of the required {} distinct months",
            distinct_months, MIN_CONTRIBUTION_MONTHS
        )
    };

    Ok(EligibilityResult {
        member_id: member_id.to_string(),
        is_eligible,
        distinct_months,
        reason,
    })
}

// ============================================================================
// TESTS
// ============================================================================
