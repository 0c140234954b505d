// Reconciliation Jobs - batch maintenance across the whole population
// Each job is idempotent and safely re-entrant: the triggering scheduler
// gives no mutual-exclusion guarantee, so every run operates on a disjoint
// row predicate and applies single-row updates. A failure on one item is
// recorded and the run continues with the next.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::eligibility;
use crate::error::EngineResult;
use crate::model::{ContributionStatus, TransactionStatus};
use crate::store;

// ============================================================================
// JOB REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job: String,
    /// Rows or members inspected by this run
    pub scanned: usize,
    /// Rows whose status was changed by this run. The eligibility job
    /// mutates nothing and reports the count of eligible members here.
    pub updated: usize,
    /// Per-item failures that did not abort the run
    pub failures: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    fn new(job: &str, scanned: usize, updated: usize, failures: Vec<String>) -> Self {
        JobReport {
            job: job.to_string(),
            scanned,
            updated,
            failures,
            finished_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: scanned {}, updated {}, {} failure(s)",
            self.job,
            self.scanned,
            self.updated,
            self.failures.len()
        )
    }
}

// ============================================================================
// VALIDATION JOB
// ============================================================================

/// Mark every contribution with a non-positive amount as Invalid.
///
/// The ledger never commits such rows, so this is a repair path for data
/// that bypassed it (direct imports). Marking Invalid here is an
/// administrative repair applied regardless of the row's current status;
/// the normal lifecycle transitions govern the ledger and the retry job,
/// not this quarantine. The scan excludes rows already marked Invalid, so
/// a second run over repaired data is a no-op.
pub fn run_validation_job(conn: &Connection) -> EngineResult<JobReport> {
    info!("starting contribution validation job");

    let suspect = store::nonpositive_contributions(conn)?;
    let scanned = suspect.len();
    let mut updated = 0;
    let mut failures = Vec::new();

    for contribution in suspect {
        match store::update_contribution_status(conn, &contribution.id, ContributionStatus::Invalid)
        {
            Ok(()) => {
                warn!(
                    contribution_id = %contribution.id,
                    member_id = %contribution.member_id,
                    amount = contribution.amount,
                    "marked contribution invalid"
                );
                updated += 1;
            }
            Err(e) => failures.push(format!("contribution {}: {}", contribution.id, e)),
        }
    }

    let report = JobReport::new("validate-contributions", scanned, updated, failures);
    info!("{}", report.summary());
    Ok(report)
}

// ============================================================================
// ELIGIBILITY JOB
// ============================================================================

/// Recompute benefit eligibility for every member with contributions and
/// log the outcome. Evaluation is pure, so the run mutates nothing; a
/// per-member failure is recorded and evaluation continues.
pub fn run_eligibility_job(conn: &Connection) -> EngineResult<JobReport> {
    info!("starting benefit eligibility job");

    let members = store::members_with_contributions(conn)?;
    let scanned = members.len();
    let mut eligible = 0;
    let mut failures = Vec::new();

    for member in members {
        match eligibility::check_eligibility(conn, &member.id) {
            Ok(result) if result.is_eligible => {
                info!(member_id = %member.id, "member is eligible for benefits");
                eligible += 1;
            }
            Ok(result) => {
                info!(
                    member_id = %member.id,
                    distinct_months = result.distinct_months,
                    "member is not eligible for benefits"
                );
            }
            Err(e) => {
                warn!(member_id = %member.id, error = %e, "eligibility evaluation failed");
                failures.push(format!("member {}: {}", member.id, e));
            }
        }
    }

    let report = JobReport::new("benefit-eligibility", scanned, eligible, failures);
    info!("{}", report.summary());
    Ok(report)
}

// ============================================================================
// FAILED TRANSACTION JOB
// ============================================================================

/// Reset every Failed payment transaction to Pending so the downstream
/// processor picks it up again, and surface Failed contributions for manual
/// follow-up. This job never resubmits payment itself; it only flips
/// transaction status and reports.
pub fn run_failed_transaction_job(conn: &Connection) -> EngineResult<JobReport> {
    info!("starting failed transaction job");

    // Report-only: failed contributions keep their status, the ledger or an
    // operator decides what happens to them.
    for contribution in store::contributions_by_status(conn, ContributionStatus::Failed)? {
        warn!(
            contribution_id = %contribution.id,
            member_id = %contribution.member_id,
            amount = contribution.amount,
            "failed contribution found"
        );
    }

    let failed = store::failed_transactions(conn)?;
    let scanned = failed.len();
    let mut updated = 0;
    let mut failures = Vec::new();

    for tx in failed {
        if !tx.status.can_transition_to(TransactionStatus::Pending) {
            failures.push(format!(
                "transaction {}: no transition {} -> Pending",
                tx.id,
                tx.status.as_str()
            ));
            continue;
        }

        match store::update_transaction_status(conn, &tx.id, TransactionStatus::Pending) {
            Ok(()) => {
                warn!(
                    transaction_id = %tx.id,
                    contribution_id = %tx.contribution_id,
                    "failed transaction reset for retry"
                );
                updated += 1;
            }
            Err(e) => failures.push(format!("transaction {}: {}", tx.id, e)),
        }
    }

    let report = JobReport::new("failed-transactions", scanned, updated, failures);
    info!("{}", report.summary());
    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contribution, ContributionType, Member, PaymentTransaction};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        store::setup_database(&conn).unwrap();
        conn
    }

    fn seed_member(conn: &Connection, id: &str) {
        store::insert_member(
            conn,
            &Member {
                id: id.to_string(),
                full_name: format!("Member {}", id),
                is_active: true,
            },
        )
        .unwrap();
    }

    // Rows with bad amounts can only exist by bypassing the ledger,
    // so tests insert them through the store directly.
    fn raw_contribution(conn: &Connection, member_id: &str, amount: f64, date: &str) -> Contribution {
        let c = Contribution::new(member_id, ContributionType::Voluntary, amount, date.parse().unwrap());
        store::insert_contribution(conn, &c).unwrap();
        c
    }

    #[test]
    fn test_validation_job_marks_nonpositive_invalid() {
        let conn = test_conn();
        seed_member(&conn, "m1");

        raw_contribution(&conn, "m1", -10.0, "2024-01-05");
        raw_contribution(&conn, "m1", 0.0, "2024-01-06");
        let good = raw_contribution(&conn, "m1", 50.0, "2024-01-07");

        let report = run_validation_job(&conn).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.updated, 2);
        assert!(report.failures.is_empty());

        let all = store::contributions_by_member(&conn, "m1").unwrap();
        for c in &all {
            if c.id == good.id {
                assert_eq!(c.status, ContributionStatus::Confirmed);
            } else {
                assert_eq!(c.status, ContributionStatus::Invalid);
            }
        }
    }

    #[test]
    fn test_validation_job_is_idempotent() {
        let conn = test_conn();
        seed_member(&conn, "m1");

        raw_contribution(&conn, "m1", -10.0, "2024-01-05");

        let first = run_validation_job(&conn).unwrap();
        assert_eq!(first.updated, 1);

        // Re-running over already-repaired rows is a no-op
        let second = run_validation_job(&conn).unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.updated, 0);

        let all = store::contributions_by_member(&conn, "m1").unwrap();
        assert_eq!(all[0].status, ContributionStatus::Invalid);
    }

    #[test]
    fn test_validation_job_repairs_rows_in_any_status() {
        let conn = test_conn();
        seed_member(&conn, "m1");

        // Bad rows can bypass the ledger in any status; the quarantine
        // applies to all of them, Confirmed and Failed included
        raw_contribution(&conn, "m1", -10.0, "2024-01-05"); // stays Confirmed
        let failed = raw_contribution(&conn, "m1", 0.0, "2024-01-06");
        let pending = raw_contribution(&conn, "m1", -3.0, "2024-01-07");
        store::update_contribution_status(&conn, &failed.id, ContributionStatus::Failed).unwrap();
        store::update_contribution_status(&conn, &pending.id, ContributionStatus::Pending).unwrap();

        let first = run_validation_job(&conn).unwrap();
        assert_eq!(first.scanned, 3);
        assert_eq!(first.updated, 3);
        assert!(first.failures.is_empty());

        for c in store::contributions_by_member(&conn, "m1").unwrap() {
            assert_eq!(c.status, ContributionStatus::Invalid, "row {}", c.id);
        }

        // Nothing left to scan once every bad row is quarantined
        let second = run_validation_job(&conn).unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_eligibility_job_covers_all_members() {
        let conn = test_conn();
        seed_member(&conn, "m1");
        seed_member(&conn, "m2");
        seed_member(&conn, "m3"); // no contributions, not scanned

        for month in 1..=12 {
            store::insert_contribution(
                &conn,
                &Contribution::new(
                    "m1",
                    ContributionType::Monthly,
                    100.0,
                    format!("2024-{:02}-15", month).parse().unwrap(),
                ),
            )
            .unwrap();
        }
        raw_contribution(&conn, "m2", 50.0, "2024-01-15");

        let report = run_eligibility_job(&conn).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.updated, 1); // only m1 eligible
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_eligibility_job_mutates_nothing() {
        let conn = test_conn();
        seed_member(&conn, "m1");
        raw_contribution(&conn, "m1", 50.0, "2024-01-15");

        run_eligibility_job(&conn).unwrap();
        run_eligibility_job(&conn).unwrap();

        let all = store::contributions_by_member(&conn, "m1").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ContributionStatus::Confirmed);
    }

    #[test]
    fn test_failed_transaction_job_resets_to_pending() {
        let conn = test_conn();

        let failed_a = PaymentTransaction::new("c1", TransactionStatus::Failed);
        let failed_b = PaymentTransaction::new("c2", TransactionStatus::Failed);
        let ok = PaymentTransaction::new("c3", TransactionStatus::Success);
        for tx in [&failed_a, &failed_b, &ok] {
            store::insert_transaction(&conn, tx).unwrap();
        }

        let report = run_failed_transaction_job(&conn).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.updated, 2);

        // Nothing left in Failed; a second run finds an empty set
        assert!(store::failed_transactions(&conn).unwrap().is_empty());
        let second = run_failed_transaction_job(&conn).unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_failed_contributions_are_reported_not_mutated() {
        let conn = test_conn();
        seed_member(&conn, "m1");

        let c = raw_contribution(&conn, "m1", 80.0, "2024-01-05");
        store::update_contribution_status(&conn, &c.id, ContributionStatus::Failed).unwrap();

        run_failed_transaction_job(&conn).unwrap();

        let failed = store::contributions_by_status(&conn, ContributionStatus::Failed).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, c.id);
    }

    #[test]
    fn test_jobs_tolerate_empty_store() {
        let conn = test_conn();

        assert_eq!(run_validation_job(&conn).unwrap().scanned, 0);
        assert_eq!(run_eligibility_job(&conn).unwrap().scanned, 0);
        assert_eq!(run_failed_transaction_job(&conn).unwrap().scanned, 0);
    }
}
