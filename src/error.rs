use thiserror::Error;

/// Why a caller could not be authenticated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Invalid credentials")]
    BadCredentials,

    #[error("Not signed in")]
    MissingToken,
}

#[derive(Error, Debug)]
pub enum FinError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not read spreadsheet: {0}")]
    ParseFailure(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(#[from] AuthError),

    #[error("Conflict: {0}")]
    IntegrityConflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FinError>;

/// Turn a unique-constraint violation into `IntegrityConflict`, leaving every
/// other storage error untouched.
pub fn map_unique_violation(err: rusqlite::Error, what: &str) -> FinError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            FinError::IntegrityConflict(format!("{what} already exists"))
        }
        _ => FinError::Db(err),
    }
}
