//! Bulk upload commands: `upload`, `status` and `jobs run`.

use std::path::Path;

use colored::Colorize;

use crate::cli::session::signed_in;
use crate::clock::system_clock;
use crate::error::{FinError, Result};
use crate::ingest::{ingest_rows, IngestOutcome};
use crate::models::RecordKind;
use crate::settings::load_settings;
use crate::sheet::read_file;
use crate::status::{resolve_status, JobStatus};
use crate::worker::drain;

fn print_issues(issues: &[String]) {
    for issue in issues {
        println!("  {} {issue}", "!".yellow());
    }
}

pub fn upload(kind: &str, file: &str) -> Result<()> {
    let kind: RecordKind = kind.parse()?;
    let settings = load_settings();
    let (mut conn, user) = signed_in(&settings)?;

    let rows = read_file(Path::new(file))?;
    let clock = system_clock();
    match ingest_rows(&mut conn, clock.as_ref(), kind, user.id, &rows)? {
        IngestOutcome::Processed { inserted, issues } => {
            println!("{} {inserted} {kind} records", "Uploaded".green());
            if !issues.is_empty() {
                println!("{} rows skipped:", issues.len());
                print_issues(&issues);
            }
        }
        IngestOutcome::Deferred {
            tracking_code,
            wait_minutes,
            issue_count,
        } => {
            println!("Upload queued. Tracking code: {}", tracking_code.bold());
            println!("Check back in about {wait_minutes} minute(s) with `fintrack status {tracking_code}`.");
            if issue_count > 0 {
                println!("{issue_count} rows will be skipped.");
            }
            println!("Jobs are completed by `fintrack serve` or `fintrack jobs run`.");
        }
    }
    Ok(())
}

pub fn status(code: &str) -> Result<()> {
    let settings = load_settings();
    let (conn, user) = signed_in(&settings)?;
    let clock = system_clock();
    match resolve_status(&conn, clock.as_ref(), code, &user, settings.poll_scope)? {
        JobStatus::Pending { wait_minutes } => {
            println!("{} (about {wait_minutes} minute(s) left)", "Pending".yellow());
        }
        JobStatus::Ready { issues, issue_count } => {
            println!("{} with {issue_count} issue(s)", "Ready".green());
            print_issues(&issues);
        }
    }
    Ok(())
}

pub fn run_pending() -> Result<()> {
    let settings = load_settings();
    crate::db::open(&settings.db_path())?;
    let results = drain(&settings.db_path(), &system_clock())?;
    if results.is_empty() {
        println!("No pending jobs.");
        return Ok(());
    }
    let mut failed = 0;
    for (code, outcome) in results {
        match outcome {
            Ok(done) => println!("{} {code}: {} rows", "done".green(), done.inserted),
            Err(e) => {
                failed += 1;
                println!("{} {code}: {e}", "failed".red());
            }
        }
    }
    if failed > 0 {
        return Err(FinError::Other(format!("{failed} job(s) failed")));
    }
    Ok(())
}
