// Contribution Validators
// The business rules the ledger composes, as named functions returning
// tagged outcomes. Each rule is testable in isolation.

use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::Connection;

use crate::error::{EngineError, EngineResult};
use crate::store;

/// Rule: contribution amount must be greater than zero
pub fn amount_positive(amount: f64) -> EngineResult<()> {
    if amount <= 0.0 {
        return Err(EngineError::InvalidAmount { amount });
    }

    Ok(())
}

/// Rule: contribution date must not be in the future (UTC)
pub fn date_not_future(date: NaiveDate) -> EngineResult<()> {
    let today = Utc::now().date_naive();
    if date > today {
        return Err(EngineError::FutureDate { date });
    }

    Ok(())
}

/// Rule: the member must resolve via the member directory
pub fn member_known(conn: &Connection, member_id: &str) -> EngineResult<()> {
    match store::find_member(conn, member_id)? {
        Some(_) => Ok(()),
        None => Err(EngineError::UnknownMember {
            member_id: member_id.to_string(),
        }),
    }
}

/// Rule: no Monthly contribution yet for the member in this calendar month.
/// Advisory fast-path only: the store's unique index is the authority,
/// this check just produces the conflict error without attempting an insert.
pub fn period_unclaimed(conn: &Connection, member_id: &str, date: NaiveDate) -> EngineResult<()> {
    let (year, month) = (date.year(), date.month());
    if store::monthly_exists_for_period(conn, member_id, year, month)? {
        return Err(EngineError::DuplicatePeriod {
            member_id: member_id.to_string(),
            year,
            month,
        });
    }

    Ok(())
}
