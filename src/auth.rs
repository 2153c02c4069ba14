//! Sign-up, sign-in and signed access tokens.
//!
//! Passwords are stored as argon2 PHC strings. Access tokens are
//! `base64url(claims).base64url(hmac_sha256(secret, claims_part))` where the
//! claims carry the username and an expiry in Unix seconds.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{map_unique_violation, AuthError, FinError, Result};
use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Drop for SignUp {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| FinError::Other(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        username: row.get(4)?,
        email: row.get(5)?,
    })
}

const USER_COLUMNS: &str = "id, first_name, last_name, date_of_birth, username, email";

pub fn sign_up(conn: &Connection, new_user: &SignUp) -> Result<i64> {
    let hash = hash_password(&new_user.password)?;
    conn.execute(
        "INSERT INTO users (first_name, last_name, date_of_birth, username, email, password_hash) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            new_user.first_name.trim(),
            new_user.last_name.trim(),
            new_user.date_of_birth.trim(),
            new_user.username.trim(),
            new_user.email.trim(),
            hash,
        ],
    )
    .map_err(|e| map_unique_violation(e, "Username or email"))?;
    Ok(conn.last_insert_rowid())
}

/// Check a username-or-email and password pair.
pub fn sign_in(conn: &Connection, username_or_email: &str, password: &str) -> Result<User> {
    let login = username_or_email.trim();
    let found = conn
        .query_row(
            &format!(
                "SELECT {USER_COLUMNS}, password_hash FROM users \
                 WHERE username = ?1 OR email = ?1 \
                 ORDER BY (username = ?1) DESC LIMIT 1"
            ),
            [login],
            |row| Ok((user_from_row(row)?, row.get::<_, String>(6)?)),
        )
        .optional()?;
    match found {
        Some((user, hash)) if verify_password(password, &hash) => Ok(user),
        _ => Err(AuthError::BadCredentials.into()),
    }
}

pub fn find_user(conn: &Connection, username: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            user_from_row,
        )
        .optional()?)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

fn mac(secret: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret).map_err(|e| FinError::Settings(format!("bad token secret: {e}")))
}

pub fn issue_token(secret: &[u8], username: &str, now: DateTime<Utc>, ttl: Duration) -> Result<String> {
    let claims = Claims {
        sub: username.to_string(),
        exp: (now + ttl).timestamp(),
    };
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let mut mac = mac(secret)?;
    mac.update(body.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{body}.{sig}"))
}

/// Validate a token's signature and expiry and return its subject.
pub fn verify_token(secret: &[u8], token: &str, now: DateTime<Utc>) -> Result<String> {
    let (body, sig) = token.trim().split_once('.').ok_or(AuthError::Invalid)?;
    let sig = URL_SAFE_NO_PAD.decode(sig).map_err(|_| AuthError::Invalid)?;
    let mut mac = mac(secret)?;
    mac.update(body.as_bytes());
    mac.verify_slice(&sig).map_err(|_| AuthError::Invalid)?;

    let raw = URL_SAFE_NO_PAD.decode(body).map_err(|_| AuthError::Invalid)?;
    let claims: Claims = serde_json::from_slice(&raw).map_err(|_| AuthError::Invalid)?;
    if now.timestamp() >= claims.exp {
        return Err(AuthError::Expired.into());
    }
    if claims.sub.is_empty() {
        return Err(AuthError::Invalid.into());
    }
    Ok(claims.sub)
}

/// Resolve a token to the user it was issued for.
pub fn authenticate(conn: &Connection, secret: &[u8], token: &str, now: DateTime<Utc>) -> Result<User> {
    let username = verify_token(secret, token, now)?;
    find_user(conn, &username)?.ok_or_else(|| AuthError::Invalid.into())
}
