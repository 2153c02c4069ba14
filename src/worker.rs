//! Background completion of deferred uploads.
//!
//! [`JobQueue::submit`] returns immediately. A dispatcher task pulls tracking
//! codes off the channel and completes each one on the blocking pool, with at
//! most `workers` jobs in flight. Each job opens its own connection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::clock::SharedClock;
use crate::db::get_connection;
use crate::error::Result;
use crate::jobs::{complete_job, incomplete_jobs, JobCompletion};

#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl JobQueue {
    /// Start the dispatcher on the current tokio runtime.
    pub fn start(db_path: PathBuf, clock: SharedClock, workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(rx, db_path, clock, workers.max(1)));
        Self { tx }
    }

    pub fn submit(&self, tracking_code: String) {
        if self.tx.send(tracking_code).is_err() {
            warn!("job queue is closed; job will be picked up on next start");
        }
    }

    /// Enqueue every job left incomplete by a previous run.
    pub fn resume_incomplete(&self, db_path: &Path) -> Result<usize> {
        let conn = get_connection(db_path)?;
        let codes = incomplete_jobs(&conn)?;
        let count = codes.len();
        for code in codes {
            self.submit(code);
        }
        if count > 0 {
            info!(count, "resumed incomplete jobs");
        }
        Ok(count)
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<String>,
    db_path: PathBuf,
    clock: SharedClock,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers));
    while let Some(code) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let db_path = db_path.clone();
        let clock = clock.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            match run_job(&db_path, &clock, &code) {
                Ok(done) if done.already_complete => info!(%code, "job already complete"),
                Ok(done) => info!(%code, inserted = done.inserted, "job complete"),
                Err(e) => error!(%code, error = %e, "job failed; it stays pending"),
            }
        });
    }
}

/// Complete one job with a freshly opened connection.
pub fn run_job(db_path: &Path, clock: &SharedClock, tracking_code: &str) -> Result<JobCompletion> {
    let mut conn = get_connection(db_path)?;
    complete_job(&mut conn, tracking_code, clock.utc())
}

/// Complete every pending job in order, on the calling thread.
pub fn drain(db_path: &Path, clock: &SharedClock) -> Result<Vec<(String, Result<JobCompletion>)>> {
    let codes = {
        let conn = get_connection(db_path)?;
        incomplete_jobs(&conn)?
    };
    Ok(codes
        .into_iter()
        .map(|code| {
            let outcome = run_job(db_path, clock, &code);
            (code, outcome)
        })
        .collect())
}
