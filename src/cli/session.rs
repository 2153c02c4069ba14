use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::authenticate;
use crate::clock::system_clock;
use crate::db;
use crate::error::{AuthError, Result};
use crate::models::User;
use crate::settings::Settings;

#[derive(Serialize, Deserialize)]
struct Session {
    token: String,
}

pub fn save_token(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(&Session {
        token: token.to_string(),
    })?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn load_token(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let session: Session = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(Some(session.token))
}

/// Remove the stored session. Returns whether one existed.
pub fn clear(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    Ok(true)
}

/// Open the database and resolve the signed-in user from the stored token.
pub fn signed_in(settings: &Settings) -> Result<(Connection, User)> {
    let token = load_token(&settings.session_path())?.ok_or(AuthError::MissingToken)?;
    let conn = db::open(&settings.db_path())?;
    let user = authenticate(&conn, settings.secret()?, &token, system_clock().utc())?;
    Ok((conn, user))
}
