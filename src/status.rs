use mockable::Clock;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::{FinError, Result};
use crate::jobs::lookup_job;
use crate::models::User;
use crate::settings::PollScope;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending { wait_minutes: i64 },
    Ready { issues: Vec<String>, issue_count: i64 },
}

/// Report where a tracking job stands for an authenticated caller.
///
/// A job is ready once its ready time has passed and a worker has completed
/// it. Until then the remaining wait is reported in whole minutes, rounded
/// down and never negative.
pub fn resolve_status(
    conn: &Connection,
    clock: &dyn Clock,
    tracking_code: &str,
    caller: &User,
    scope: PollScope,
) -> Result<JobStatus> {
    let job = lookup_job(conn, tracking_code)?
        .filter(|job| scope == PollScope::Bearer || job.user_id == caller.id)
        .ok_or_else(|| FinError::NotFound("Tracking code".to_string()))?;

    let now = clock.utc();
    if now < job.ready_time || job.completed_at.is_none() {
        let wait_minutes = (job.ready_time - now).num_minutes().max(0);
        return Ok(JobStatus::Pending { wait_minutes });
    }
    Ok(JobStatus::Ready {
        issues: job.issues,
        issue_count: job.issue_count,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::clock::test_support::MutableClock;
    use crate::db::test_support::{add_user, test_db};
    use crate::ingest::{ingest_upload, IngestOutcome};
    use crate::jobs::complete_job;
    use crate::models::RecordKind;

    fn user(id: i64) -> User {
        User {
            id,
            first_name: "T".to_string(),
            last_name: "U".to_string(),
            date_of_birth: "1990-01-01".to_string(),
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
        }
    }

    fn deferred_upload(conn: &mut Connection, clock: &MutableClock, uid: i64) -> String {
        let mut csv = String::from("amount,category,description\n");
        for i in 0..301 {
            csv.push_str(&format!("{i},Food,Item\n"));
        }
        match ingest_upload(conn, clock, RecordKind::Expense, uid, "ex.csv", csv.as_bytes()).unwrap() {
            IngestOutcome::Deferred { tracking_code, wait_minutes, issue_count } => {
                assert_eq!(wait_minutes, 1);
                assert_eq!(issue_count, 0);
                tracking_code
            }
            other => panic!("expected deferred outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_then_ready_after_a_minute() {
        let (_dir, mut conn) = test_db();
        let uid = add_user(&conn, "alice1");
        let clock = MutableClock::at_epoch();
        let code = deferred_upload(&mut conn, &clock, uid);
        let caller = user(uid);

        let status = resolve_status(&conn, &clock, &code, &caller, PollScope::Owner).unwrap();
        assert_eq!(status, JobStatus::Pending { wait_minutes: 1 });

        complete_job(&mut conn, &code, clock.utc()).unwrap();
        clock.advance(Duration::seconds(30));
        let status = resolve_status(&conn, &clock, &code, &caller, PollScope::Owner).unwrap();
        assert_eq!(status, JobStatus::Pending { wait_minutes: 0 });

        clock.advance(Duration::seconds(31));
        let ready = resolve_status(&conn, &clock, &code, &caller, PollScope::Owner).unwrap();
        assert_eq!(ready, JobStatus::Ready { issues: vec![], issue_count: 0 });

        clock.advance(Duration::days(30));
        let again = resolve_status(&conn, &clock, &code, &caller, PollScope::Owner).unwrap();
        assert_eq!(again, ready);

        let inserted: i64 = conn.query_row("SELECT count(*) FROM expenses", [], |r| r.get(0)).unwrap();
        assert_eq!(inserted, 301);
    }

    #[test]
    fn test_stays_pending_until_worker_completes() {
        let (_dir, mut conn) = test_db();
        let uid = add_user(&conn, "alice1");
        let clock = MutableClock::at_epoch();
        let code = deferred_upload(&mut conn, &clock, uid);

        clock.advance(Duration::minutes(5));
        let status = resolve_status(&conn, &clock, &code, &user(uid), PollScope::Owner).unwrap();
        assert_eq!(status, JobStatus::Pending { wait_minutes: 0 });
    }

    #[test]
    fn test_unknown_code_is_not_found() {
        let (_dir, conn) = test_db();
        let clock = MutableClock::at_epoch();
        let err = resolve_status(&conn, &clock, "feed", &user(1), PollScope::Owner).unwrap_err();
        assert!(matches!(err, FinError::NotFound(_)));
    }

    #[test]
    fn test_poll_scope_controls_other_callers() {
        let (_dir, mut conn) = test_db();
        let alice = add_user(&conn, "alice1");
        let bob = add_user(&conn, "bobby1");
        let clock = MutableClock::at_epoch();
        let code = deferred_upload(&mut conn, &clock, alice);

        let err = resolve_status(&conn, &clock, &code, &user(bob), PollScope::Owner).unwrap_err();
        assert!(matches!(err, FinError::NotFound(_)));

        let status = resolve_status(&conn, &clock, &code, &user(bob), PollScope::Bearer).unwrap();
        assert!(matches!(status, JobStatus::Pending { .. }));
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(JobStatus::Pending { wait_minutes: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "pending", "wait_minutes": 1}));
    }
}
