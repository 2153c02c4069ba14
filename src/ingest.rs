//! Bulk upload ingestion: validate every row, then either insert the valid
//! rows right away or hand them to a tracking job.

use chrono::Duration;
use mockable::Clock;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

use crate::error::Result;
use crate::jobs::{create_job, generate_tracking_code, NewTrackingJob};
use crate::ledger::insert_record;
use crate::models::{RecordKind, SheetRow};
use crate::sheet::read_rows;
use crate::validator::scan_rows;

/// Uploads with this many rows or more are deferred.
pub const DEFERRED_THRESHOLD: usize = 300;

/// Advertised wait before a deferred job can be ready.
pub const READY_DELAY_MINUTES: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Processed {
        inserted: usize,
        issues: Vec<String>,
    },
    Deferred {
        tracking_code: String,
        wait_minutes: i64,
        issue_count: usize,
    },
}

pub fn ingest_rows(
    conn: &mut Connection,
    clock: &dyn Clock,
    kind: RecordKind,
    user_id: i64,
    rows: &[SheetRow],
) -> Result<IngestOutcome> {
    let scan = scan_rows(rows, kind, user_id);
    let issues = scan.issue_texts();
    debug!(kind = %kind, rows = rows.len(), valid = scan.valid.len(), issues = issues.len(), "scanned upload");

    if rows.len() < DEFERRED_THRESHOLD {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (_, record) in &scan.valid {
            insert_record(&tx, record)?;
        }
        tx.commit()?;
        info!(kind = %kind, user_id, inserted = scan.valid.len(), "upload processed");
        return Ok(IngestOutcome::Processed {
            inserted: scan.valid.len(),
            issues,
        });
    }

    let tracking_code = generate_tracking_code();
    let ready_time = clock.utc() + Duration::minutes(READY_DELAY_MINUTES);
    create_job(
        conn,
        &NewTrackingJob {
            tracking_code: &tracking_code,
            user_id,
            record_kind: kind,
            ready_time,
            issues: &issues,
        },
        &scan.valid,
    )?;
    info!(kind = %kind, user_id, rows = rows.len(), %tracking_code, "upload deferred");
    Ok(IngestOutcome::Deferred {
        tracking_code,
        wait_minutes: READY_DELAY_MINUTES,
        issue_count: issues.len(),
    })
}

/// Parse an uploaded file and ingest its rows. An unreadable file aborts
/// before anything is written.
pub fn ingest_upload(
    conn: &mut Connection,
    clock: &dyn Clock,
    kind: RecordKind,
    user_id: i64,
    filename: &str,
    bytes: &[u8],
) -> Result<IngestOutcome> {
    let rows = read_rows(filename, bytes)?;
    ingest_rows(conn, clock, kind, user_id, &rows)
}
