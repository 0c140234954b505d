// Contribution Ledger - the single write path for contributions
// Validation and insert run inside one SQLite transaction, so a rejected
// request leaves no partial row behind.

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

use crate::error::EngineResult;
use crate::model::{Contribution, ContributionType};
use crate::store;
use crate::validate;

/// Record a monthly contribution for a member.
///
/// Checked in order: amount > 0, date not in the future, member resolves,
/// period not already claimed. The per-period rule is double-enforced by
/// the store's unique index, which also decides a concurrent insert race.
pub fn add_monthly(
    conn: &mut Connection,
    member_id: &str,
    amount: f64,
    date: NaiveDate,
) -> EngineResult<Contribution> {
    add_contribution(conn, member_id, ContributionType::Monthly, amount, date)
}

/// Record a voluntary contribution. Same checks as monthly except the
/// period-uniqueness rule: voluntary contributions may recur freely.
pub fn add_voluntary(
    conn: &mut Connection,
    member_id: &str,
    amount: f64,
    date: NaiveDate,
) -> EngineResult<Contribution> {
    add_contribution(conn, member_id, ContributionType::Voluntary, amount, date)
}

fn add_contribution(
    conn: &mut Connection,
    member_id: &str,
    contribution_type: ContributionType,
    amount: f64,
    date: NaiveDate,
) -> EngineResult<Contribution> {
    validate::amount_positive(amount)?;
    validate::date_not_future(date)?;

    let tx = conn.transaction()?;

    validate::member_known(&tx, member_id)?;
    if contribution_type == ContributionType::Monthly {
        validate::period_unclaimed(&tx, member_id, date)?;
    }

    let contribution = Contribution::new(member_id, contribution_type, amount, date);
    store::insert_contribution(&tx, &contribution)?;

    tx.commit()?;

    info!(
        member_id,
        contribution_id = %contribution.id,
        contribution_type = contribution_type.as_str(),
        amount,
        %date,
        "contribution recorded"
    );

    Ok(contribution)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::model::{ContributionStatus, Member};
    use chrono::{Duration, Utc};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        store::setup_database(&conn).unwrap();
        store::insert_member(
            &conn,
            &Member {
                id: "m1".into(),
                full_name: "Ada Lovelace".into(),
                is_active: true,
            },
        )
        .unwrap();
        conn
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_monthly_success() {
        let mut conn = test_conn();

        let c = add_monthly(&mut conn, "m1", 100.0, date("2024-01-15")).unwrap();
        assert_eq!(c.contribution_type, ContributionType::Monthly);
        assert_eq!(c.status, ContributionStatus::Confirmed);
        assert_eq!(store::contribution_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_add_monthly_rejects_nonpositive_amount() {
        let mut conn = test_conn();

        for amount in [0.0, -5.0, -0.01] {
            let err = add_monthly(&mut conn, "m1", amount, date("2024-01-15")).unwrap_err();
            assert!(matches!(err, EngineError::InvalidAmount { .. }));
        }

        // No row persisted by any failed call
        assert_eq!(store::contribution_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_add_monthly_rejects_future_date() {
        let mut conn = test_conn();

        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        let err = add_monthly(&mut conn, "m1", 100.0, tomorrow).unwrap_err();
        assert!(matches!(err, EngineError::FutureDate { .. }));
        assert_eq!(store::contribution_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_add_monthly_rejects_unknown_member() {
        let mut conn = test_conn();

        let err = add_monthly(&mut conn, "ghost", 100.0, date("2024-01-15")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownMember { .. }));
        assert_eq!(store::contribution_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_add_monthly_duplicate_period_conflict() {
        let mut conn = test_conn();

        // First call in January succeeds, second fails, regardless of day
        add_monthly(&mut conn, "m1", 100.0, date("2024-01-15")).unwrap();
        let err = add_monthly(&mut conn, "m1", 50.0, date("2024-01-20")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DuplicatePeriod { year: 2024, month: 1, .. }
        ));

        // Exactly one row committed
        assert_eq!(store::contribution_count(&conn).unwrap(), 1);

        // Next month is a fresh period
        add_monthly(&mut conn, "m1", 50.0, date("2024-02-20")).unwrap();
        assert_eq!(store::contribution_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_add_voluntary_no_period_constraint() {
        let mut conn = test_conn();

        add_voluntary(&mut conn, "m1", 10.0, date("2024-01-05")).unwrap();
        add_voluntary(&mut conn, "m1", 20.0, date("2024-01-25")).unwrap();
        assert_eq!(store::contribution_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_add_voluntary_same_checks_as_monthly() {
        let mut conn = test_conn();

        assert!(matches!(
            add_voluntary(&mut conn, "m1", -1.0, date("2024-01-05")).unwrap_err(),
            EngineError::InvalidAmount { .. }
        ));
        assert!(matches!(
            add_voluntary(&mut conn, "ghost", 10.0, date("2024-01-05")).unwrap_err(),
            EngineError::UnknownMember { .. }
        ));

        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        assert!(matches!(
            add_voluntary(&mut conn, "m1", 10.0, tomorrow).unwrap_err(),
            EngineError::FutureDate { .. }
        ));

        assert_eq!(store::contribution_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_monthly_blocks_period_but_not_voluntary() {
        let mut conn = test_conn();

        add_monthly(&mut conn, "m1", 100.0, date("2024-01-15")).unwrap();
        // A voluntary contribution in the same month is allowed
        add_voluntary(&mut conn, "m1", 25.0, date("2024-01-16")).unwrap();
        assert_eq!(store::contribution_count(&conn).unwrap(), 2);
    }
}
