// Pension Contribution Engine - CLI
// Thin command dispatch over the library; the server binary carries the
// HTTP binding.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::env;

use pension_engine::{
    add_monthly, add_voluntary, build_statement, check_eligibility, contribution_count,
    insert_member, run_eligibility_job, run_failed_transaction_job, run_validation_job,
    setup_database, EngineError, Member,
};

fn db_path() -> String {
    env::var("PENSION_DB").unwrap_or_else(|_| "pension.db".to_string())
}

fn open_db() -> Result<Connection> {
    let path = db_path();
    let conn = Connection::open(&path).with_context(|| format!("failed to open {}", path))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pension_engine=info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    match command {
        "init" => {
            let conn = open_db()?;
            let count = contribution_count(&conn)?;
            println!("✓ Database initialized at {}", db_path());
            println!("✓ {} contribution(s) on record", count);
        }
        "add-member" => {
            let id = arg(&args, 2, "member id")?;
            let name = arg(&args, 3, "full name")?;
            let conn = open_db()?;
            insert_member(
                &conn,
                &Member {
                    id: id.clone(),
                    full_name: name,
                    is_active: true,
                },
            )?;
            println!("✓ Member {} registered", id);
        }
        "add-monthly" | "add-voluntary" => {
            let member_id = arg(&args, 2, "member id")?;
            let amount: f64 = arg(&args, 3, "amount")?.parse().context("invalid amount")?;
            let date: NaiveDate = arg(&args, 4, "date (YYYY-MM-DD)")?
                .parse()
                .context("invalid date, expected YYYY-MM-DD")?;

            let mut conn = open_db()?;
            let result = if command == "add-monthly" {
                add_monthly(&mut conn, &member_id, amount, date)
            } else {
                add_voluntary(&mut conn, &member_id, amount, date)
            };

            match result {
                Ok(c) => println!("✓ Contribution {} recorded", c.id),
                Err(e) => fail(e),
            }
        }
        "statement" => {
            let member_id = arg(&args, 2, "member id")?;
            let conn = open_db()?;
            match build_statement(&conn, &member_id) {
                Ok(statement) => {
                    println!("Statement for member {}", statement.member_id);
                    for c in &statement.contributions {
                        println!(
                            "  {}  {:<9}  {:>10.2}  {}",
                            c.contribution_date,
                            c.contribution_type.as_str(),
                            c.amount,
                            c.status.as_str()
                        );
                    }
                    println!("Total contributions: {:.2}", statement.total_contributions);
                }
                Err(e) => fail(e),
            }
        }
        "eligibility" => {
            let member_id = arg(&args, 2, "member id")?;
            let conn = open_db()?;
            match check_eligibility(&conn, &member_id) {
                Ok(result) => {
                    let verdict = if result.is_eligible { "ELIGIBLE" } else { "NOT ELIGIBLE" };
                    println!("Member {}: {}", result.member_id, verdict);
                    println!("  {}", result.reason);
                }
                Err(e) => fail(e),
            }
        }
        "run-jobs" => {
            let which = args.get(2).map(String::as_str).unwrap_or("all");
            let conn = open_db()?;

            let reports = match which {
                "validation" => vec![run_validation_job(&conn)?],
                "eligibility" => vec![run_eligibility_job(&conn)?],
                "failed-transactions" => vec![run_failed_transaction_job(&conn)?],
                "all" => vec![
                    run_validation_job(&conn)?,
                    run_eligibility_job(&conn)?,
                    run_failed_transaction_job(&conn)?,
                ],
                other => bail!("unknown job '{}', expected validation | eligibility | failed-transactions | all", other),
            };

            for report in reports {
                println!("✓ {}", report.summary());
            }
        }
        _ => {
            println!("Pension Contribution Engine v{}", pension_engine::VERSION);
            println!();
            println!("Usage:");
            println!("  pension-engine init");
            println!("  pension-engine add-member <id> <full-name>");
            println!("  pension-engine add-monthly <member-id> <amount> <YYYY-MM-DD>");
            println!("  pension-engine add-voluntary <member-id> <amount> <YYYY-MM-DD>");
            println!("  pension-engine statement <member-id>");
            println!("  pension-engine eligibility <member-id>");
            println!("  pension-engine run-jobs [validation|eligibility|failed-transactions|all]");
            println!();
            println!("Database path is taken from PENSION_DB (default: pension.db)");
        }
    }

    Ok(())
}

fn arg(args: &[String], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .with_context(|| format!("missing argument: {}", name))
}

fn fail(e: EngineError) -> ! {
    eprintln!("✗ [{}] {}", e.code(), e);
    std::process::exit(1);
}
