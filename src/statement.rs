// Statement Builder
// Read-only projection over a member's contribution history.

use rusqlite::Connection;

use crate::error::{EngineError, EngineResult};
use crate::model::ContributionStatement;
use crate::store;

/// Build a contribution statement for a member: the full contribution list
/// ordered by date, plus the sum of amounts across every type and status.
/// Reads the latest committed state; the store query itself provides the
/// date ordering.
pub fn build_statement(conn: &Connection, member_id: &str) -> EngineResult<ContributionStatement> {
    let contributions = store::contributions_by_member(conn, member_id)?;

    if contributions.is_empty() {
        return Err(EngineError::NoContributions {
            member_id: member_id.to_string(),
        });
    }

    let total_contributions = contributions.iter().map(|c| c.amount).sum();

    Ok(ContributionStatement {
        member_id: member_id.to_string(),
        total_contributions,
        contributions,
    })
}

// ============================================================================
// TESTS
// ============================================================================
