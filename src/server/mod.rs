//! HTTP API: shared state, startup, and the blocking bridge into SQLite.

mod api;
mod error;
mod router;
#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::info;

use crate::clock::{system_clock, SharedClock};
use crate::db;
use crate::settings::{PollScope, Settings};
use crate::worker::JobQueue;

pub use error::ApiError;
pub use router::build_router;

/// Everything a handler needs. Connections are opened per request.
pub struct AppState {
    pub db_path: PathBuf,
    pub secret: Vec<u8>,
    pub token_ttl: chrono::Duration,
    pub poll_scope: PollScope,
    pub clock: SharedClock,
    pub queue: JobQueue,
}

impl AppState {
    /// Build state from settings and start the job queue on the current runtime.
    pub fn from_settings(settings: &Settings, clock: SharedClock) -> crate::error::Result<Self> {
        let db_path = settings.db_path();
        db::open(&db_path)?;
        let queue = JobQueue::start(db_path.clone(), clock.clone(), settings.workers);
        Ok(Self {
            db_path,
            secret: settings.secret()?.to_vec(),
            token_ttl: chrono::Duration::minutes(settings.token_ttl_minutes),
            poll_scope: settings.poll_scope,
            clock,
            queue,
        })
    }
}

/// Run `f` against a fresh connection on the blocking pool.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> crate::error::Result<T> + Send + 'static,
{
    let db_path = state.db_path.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = db::get_connection(&db_path)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| ApiError::internal(format!("blocking task failed: {e}")))?
    .map_err(ApiError::from)
}

/// Serve the API until the process is stopped.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_settings(&settings, system_clock())?);
    state.queue.resume_incomplete(&state.db_path)?;

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
