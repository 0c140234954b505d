// Contribution Store - SQLite persistence layer
// Holds members, contributions and payment transactions.
// The monthly per-period uniqueness rule is enforced by the store itself
// (partial unique index), so two racing inserts cannot both commit.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::error::{EngineError, EngineResult};
use crate::model::{
    Contribution, ContributionStatus, ContributionType, Member, PaymentTransaction,
    TransactionStatus,
};

pub fn setup_database(conn: &Connection) -> EngineResult<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contributions (
            id TEXT PRIMARY KEY,
            member_id TEXT NOT NULL,
            contribution_type TEXT NOT NULL,
            amount REAL NOT NULL,
            contribution_date TEXT NOT NULL,
            period_year INTEGER NOT NULL,
            period_month INTEGER NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            contribution_id TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // At most one Monthly contribution per member per calendar month.
    // Enforced here rather than by a check-then-insert in the ledger.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_monthly_period
         ON contributions(member_id, period_year, period_month)
         WHERE contribution_type = 'Monthly'",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contributions_member ON contributions(member_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contributions_status ON contributions(status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// MEMBERS
// ============================================================================

pub fn insert_member(conn: &Connection, member: &Member) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO members (id, full_name, is_active) VALUES (?1, ?2, ?3)",
        params![member.id, member.full_name, member.is_active as i64],
    )?;

    Ok(())
}

pub fn find_member(conn: &Connection, member_id: &str) -> EngineResult<Option<Member>> {
    let mut stmt = conn.prepare("SELECT id, full_name, is_active FROM members WHERE id = ?1")?;

    let mut rows = stmt.query_map(params![member_id], |row| {
        Ok(Member {
            id: row.get(0)?,
            full_name: row.get(1)?,
            is_active: row.get::<_, i64>(2)? != 0,
        })
    })?;

    match rows.next() {
        Some(member) => Ok(Some(member?)),
        None => Ok(None),
    }
}

/// Members that have at least one contribution on record,
/// in stable id order (batch jobs iterate this set).
pub fn members_with_contributions(conn: &Connection) -> EngineResult<Vec<Member>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT m.id, m.full_name, m.is_active
         FROM members m
         JOIN contributions c ON c.member_id = m.id
         ORDER BY m.id",
    )?;

    let members = stmt
        .query_map([], |row| {
            Ok(Member {
                id: row.get(0)?,
                full_name: row.get(1)?,
                is_active: row.get::<_, i64>(2)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(members)
}

// ============================================================================
// CONTRIBUTIONS
// ============================================================================

fn map_contribution_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contribution> {
    let type_str: String = row.get(2)?;
    let date_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(Contribution {
        id: row.get(0)?,
        member_id: row.get(1)?,
        contribution_type: ContributionType::parse(&type_str)
            .ok_or(rusqlite::Error::InvalidQuery)?,
        amount: row.get(3)?,
        contribution_date: date_str
            .parse::<NaiveDate>()
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        status: ContributionStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
        created_at: DateTime::parse_from_rfc3339(&created_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
    })
}

const CONTRIBUTION_COLUMNS: &str =
    "id, member_id, contribution_type, amount, contribution_date, status, created_at";

/// Insert a contribution row. A violation of the monthly period index is
/// reported as DuplicatePeriod so a lost insert race surfaces as a conflict,
/// not a storage failure.
pub fn insert_contribution(conn: &Connection, contribution: &Contribution) -> EngineResult<()> {
    let result = conn.execute(
        "INSERT INTO contributions (
            id, member_id, contribution_type, amount, contribution_date,
            period_year, period_month, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            contribution.id,
            contribution.member_id,
            contribution.contribution_type.as_str(),
            contribution.amount,
            contribution.contribution_date.to_string(),
            contribution.contribution_date.year(),
            contribution.contribution_date.month(),
            contribution.status.as_str(),
            contribution.created_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && contribution.contribution_type == ContributionType::Monthly =>
        {
            Err(EngineError::DuplicatePeriod {
                member_id: contribution.member_id.clone(),
                year: contribution.contribution_date.year(),
                month: contribution.contribution_date.month(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// All contributions for a member, ordered by contribution date
pub fn contributions_by_member(
    conn: &Connection,
    member_id: &str,
) -> EngineResult<Vec<Contribution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTRIBUTION_COLUMNS}
         FROM contributions
         WHERE member_id = ?1
         ORDER BY contribution_date ASC, created_at ASC",
    ))?;

    let contributions = stmt
        .query_map(params![member_id], map_contribution_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(contributions)
}

pub fn monthly_exists_for_period(
    conn: &Connection,
    member_id: &str,
    year: i32,
    month: u32,
) -> EngineResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM contributions
         WHERE member_id = ?1 AND period_year = ?2 AND period_month = ?3
           AND contribution_type = 'Monthly'",
        params![member_id, year, month],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

/// Contributions with a non-positive amount that are not yet marked Invalid.
/// Rows already repaired are excluded, which keeps the validation job
/// idempotent and re-entrant.
pub fn nonpositive_contributions(conn: &Connection) -> EngineResult<Vec<Contribution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTRIBUTION_COLUMNS}
         FROM contributions
         WHERE amount <= 0 AND status != 'Invalid'
         ORDER BY created_at ASC",
    ))?;

    let contributions = stmt
        .query_map([], map_contribution_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(contributions)
}

pub fn contributions_by_status(
    conn: &Connection,
    status: ContributionStatus,
) -> EngineResult<Vec<Contribution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTRIBUTION_COLUMNS}
         FROM contributions
         WHERE status = ?1
         ORDER BY created_at ASC",
    ))?;

    let contributions = stmt
        .query_map(params![status.as_str()], map_contribution_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(contributions)
}

pub fn update_contribution_status(
    conn: &Connection,
    contribution_id: &str,
    status: ContributionStatus,
) -> EngineResult<()> {
    conn.execute(
        "UPDATE contributions SET status = ?1 WHERE id = ?2",
        params![status.as_str(), contribution_id],
    )?;

    Ok(())
}

pub fn contribution_count(conn: &Connection) -> EngineResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM contributions", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// PAYMENT TRANSACTIONS
// ============================================================================

fn map_transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaymentTransaction> {
    let status_str: String = row.get(2)?;
    let created_str: String = row.get(3)?;
    let updated_str: String = row.get(4)?;

    Ok(PaymentTransaction {
        id: row.get(0)?,
        contribution_id: row.get(1)?,
        status: TransactionStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
        created_at: DateTime::parse_from_rfc3339(&created_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
    })
}

pub fn insert_transaction(conn: &Connection, tx: &PaymentTransaction) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO transactions (id, contribution_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            tx.id,
            tx.contribution_id,
            tx.status.as_str(),
            tx.created_at.to_rfc3339(),
            tx.updated_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub fn failed_transactions(conn: &Connection) -> EngineResult<Vec<PaymentTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, contribution_id, status, created_at, updated_at
         FROM transactions
         WHERE status = 'Failed'
         ORDER BY created_at ASC",
    )?;

    let transactions = stmt
        .query_map([], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn update_transaction_status(
    conn: &Connection,
    transaction_id: &str,
    status: TransactionStatus,
) -> EngineResult<()> {
    conn.execute(
        "UPDATE transactions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), Utc::now().to_rfc3339(), transaction_id],
    )?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
