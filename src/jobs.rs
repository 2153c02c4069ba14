//! Persisted registry of deferred uploads, keyed by tracking code.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::error::{map_unique_violation, FinError, Result};
use crate::ledger::insert_record;
use crate::models::{NewRecord, RecordKind, TrackingJob};

/// Separator used to store the issue list in a single column.
pub const ISSUE_DELIMITER: &str = "; ";

/// 16 bytes from the OS RNG, hex-encoded (32 characters).
pub fn generate_tracking_code() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn join_issues(issues: &[String]) -> String {
    issues.join(ISSUE_DELIMITER)
}

pub fn split_issues(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(ISSUE_DELIMITER).map(str::to_string).collect()
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

pub struct NewTrackingJob<'a> {
    pub tracking_code: &'a str,
    pub user_id: i64,
    pub record_kind: RecordKind,
    pub ready_time: DateTime<Utc>,
    pub issues: &'a [String],
}

/// Insert the job and its staged rows in one transaction. A tracking code
/// that already exists is rejected by the unique constraint.
pub fn create_job(conn: &mut Connection, job: &NewTrackingJob<'_>, staged: &[(usize, NewRecord)]) -> Result<()> {
    if let Some((row, record)) = staged.iter().find(|(_, r)| r.kind() != job.record_kind) {
        return Err(FinError::InvalidInput(format!(
            "row {row} is a {} record but the job holds {} records",
            record.kind(),
            job.record_kind
        )));
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO tracking_jobs (tracking_code, user_id, record_kind, ready_time, issue_count, issues) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            job.tracking_code,
            job.user_id,
            job.record_kind.key(),
            job.ready_time.to_rfc3339(),
            job.issues.len() as i64,
            join_issues(job.issues),
        ],
    )
    .map_err(|e| map_unique_violation(e, "Tracking code"))?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO tracking_job_rows (tracking_code, row_number, payload) VALUES (?1, ?2, ?3)",
        )?;
        for (row_number, record) in staged {
            let payload = serde_json::to_string(record)?;
            stmt.execute(rusqlite::params![job.tracking_code, *row_number as i64, payload])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn lookup_job(conn: &Connection, tracking_code: &str) -> Result<Option<TrackingJob>> {
    let row = conn
        .query_row(
            "SELECT tracking_code, user_id, record_kind, ready_time, issue_count, issues, completed_at \
             FROM tracking_jobs WHERE tracking_code = ?1",
            [tracking_code],
            |row| {
                let kind: String = row.get(2)?;
                let ready: String = row.get(3)?;
                let issues: String = row.get(5)?;
                let completed: Option<String> = row.get(6)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    kind,
                    parse_time(&ready)?,
                    row.get::<_, i64>(4)?,
                    split_issues(&issues),
                    completed.as_deref().map(parse_time).transpose()?,
                ))
            },
        )
        .optional()?;

    let Some((tracking_code, user_id, kind, ready_time, issue_count, issues, completed_at)) = row else {
        return Ok(None);
    };
    Ok(Some(TrackingJob {
        tracking_code,
        user_id,
        record_kind: kind.parse()?,
        ready_time,
        issue_count,
        issues,
        completed_at,
    }))
}

pub struct JobCompletion {
    pub inserted: usize,
    pub already_complete: bool,
}

/// Persist a job's staged rows into the target table and mark it complete.
/// Everything happens in one transaction; a job that is already complete is
/// left untouched.
pub fn complete_job(conn: &mut Connection, tracking_code: &str, now: DateTime<Utc>) -> Result<JobCompletion> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let completed: Option<Option<String>> = tx
        .query_row(
            "SELECT completed_at FROM tracking_jobs WHERE tracking_code = ?1",
            [tracking_code],
            |r| r.get(0),
        )
        .optional()?;
    match completed {
        None => return Err(FinError::NotFound("Tracking code".to_string())),
        Some(Some(_)) => {
            return Ok(JobCompletion {
                inserted: 0,
                already_complete: true,
            })
        }
        Some(None) => {}
    }

    let payloads: Vec<String> = {
        let mut stmt = tx.prepare(
            "SELECT payload FROM tracking_job_rows WHERE tracking_code = ?1 ORDER BY row_number",
        )?;
        let rows = stmt.query_map([tracking_code], |r| r.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };
    for payload in &payloads {
        let record: NewRecord = serde_json::from_str(payload)?;
        insert_record(&tx, &record)?;
    }
    tx.execute("DELETE FROM tracking_job_rows WHERE tracking_code = ?1", [tracking_code])?;
    tx.execute(
        "UPDATE tracking_jobs SET completed_at = ?1 WHERE tracking_code = ?2",
        rusqlite::params![now.to_rfc3339(), tracking_code],
    )?;
    tx.commit()?;

    Ok(JobCompletion {
        inserted: payloads.len(),
        already_complete: false,
    })
}

/// Codes of jobs no worker has completed yet, oldest first.
pub fn incomplete_jobs(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tracking_code FROM tracking_jobs WHERE completed_at IS NULL ORDER BY id",
    )?;
    let rows = stmt.query_map([], |r| r.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
