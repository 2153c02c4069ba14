//! Request handlers.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Multipart, Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use zeroize::Zeroize;

use super::{blocking, ApiError, AppState};
use crate::auth::{self, SignUp};
use crate::error::AuthError;
use crate::ingest::{ingest_upload, IngestOutcome};
use crate::ledger::{self, SearchFilter};
use crate::models::{Expense, Income, RecordKind, User};
use crate::status::{resolve_status, JobStatus};

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// The signed-in caller, resolved from a `token` header or a bearer token.
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(raw) = parts.headers.get("token").and_then(|v| v.to_str().ok()) {
        return Some(raw.trim().to_string());
    }
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_string())
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError(AuthError::MissingToken.into()))?;
        let secret = state.secret.clone();
        let now = state.clock.utc();
        let user = blocking(state, move |conn| auth::authenticate(conn, &secret, &token, now)).await?;
        Ok(Self(user))
    }
}

fn msg(text: &str) -> Json<Value> {
    Json(json!({ "msg": text }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUp>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(&state, move |conn| auth::sign_up(conn, &body)).await?;
    Ok((StatusCode::CREATED, msg("User created successfully")))
}

#[derive(Deserialize)]
pub struct SignIn {
    username: String,
    password: String,
}

impl Drop for SignIn {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

pub async fn signin(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignIn>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = blocking(&state, move |conn| auth::sign_in(conn, &body.username, &body.password)).await?;
    let access_token = auth::issue_token(&state.secret, &user.username, state.clock.utc(), state.token_ttl)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

// ---------------------------------------------------------------------------
// Incomes and expenses
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct IncomeBody {
    amount: f64,
    source: String,
}

#[derive(Deserialize)]
pub struct ExpenseBody {
    amount: f64,
    category: String,
    description: String,
}

pub async fn create_income(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<IncomeBody>,
) -> Result<Json<Value>, ApiError> {
    let id = blocking(&state, move |conn| ledger::add_income(conn, user.id, body.amount, &body.source)).await?;
    Ok(Json(json!({ "msg": "Income added successfully", "id": id })))
}

pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ExpenseBody>,
) -> Result<Json<Value>, ApiError> {
    let id = blocking(&state, move |conn| {
        ledger::add_expense(conn, user.id, body.amount, &body.category, &body.description)
    })
    .await?;
    Ok(Json(json!({ "msg": "Expense added successfully", "id": id })))
}

pub async fn update_income(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<IncomeBody>,
) -> Result<Json<Value>, ApiError> {
    blocking(&state, move |conn| ledger::update_income(conn, user.id, id, body.amount, &body.source)).await?;
    Ok(msg("Income updated successfully"))
}

pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<ExpenseBody>,
) -> Result<Json<Value>, ApiError> {
    blocking(&state, move |conn| {
        ledger::update_expense(conn, user.id, id, body.amount, &body.category, &body.description)
    })
    .await?;
    Ok(msg("Expense updated successfully"))
}

pub async fn delete_income(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    blocking(&state, move |conn| ledger::delete_record(conn, RecordKind::Income, user.id, id)).await?;
    Ok(msg("Income deleted successfully"))
}

pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    blocking(&state, move |conn| ledger::delete_record(conn, RecordKind::Expense, user.id, id)).await?;
    Ok(msg("Expense deleted successfully"))
}

pub async fn list_incomes(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Income>>, ApiError> {
    let rows = blocking(&state, move |conn| ledger::list_incomes(conn, user.id, &filter)).await?;
    Ok(Json(rows))
}

pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let rows = blocking(&state, move |conn| ledger::list_expenses(conn, user.id, &filter)).await?;
    Ok(Json(rows))
}

pub async fn financial_summary(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ledger::Summary>, ApiError> {
    let summary = blocking(&state, move |conn| ledger::summary(conn, user.id)).await?;
    Ok(Json(summary))
}

// ---------------------------------------------------------------------------
// Bulk upload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResponse {
    Processed {
        message: String,
        inserted: usize,
        issues: Vec<String>,
    },
    Pending {
        tracking_code: String,
        wait_minutes: i64,
    },
}

impl IntoResponse for UploadResponse {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Processed { .. } => StatusCode::OK,
            Self::Pending { .. } => StatusCode::ACCEPTED,
        };
        (status, Json(self)).into_response()
    }
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<UploadResponse, ApiError> {
    let kind: RecordKind = kind.parse()?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("bad multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
        file = Some((filename, bytes));
        break;
    }
    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("missing multipart field 'file'"))?;

    let clock = state.clock.clone();
    let outcome = blocking(&state, move |conn| {
        ingest_upload(conn, clock.as_ref(), kind, user.id, &filename, &bytes)
    })
    .await?;

    Ok(match outcome {
        IngestOutcome::Processed { inserted, issues } => UploadResponse::Processed {
            message: format!("Uploaded {inserted} {kind} records"),
            inserted,
            issues,
        },
        IngestOutcome::Deferred {
            tracking_code,
            wait_minutes,
            ..
        } => {
            state.queue.submit(tracking_code.clone());
            UploadResponse::Pending {
                tracking_code,
                wait_minutes,
            }
        }
    })
}

pub async fn upload_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    let clock = state.clock.clone();
    let scope = state.poll_scope;
    let status = blocking(&state, move |conn| resolve_status(conn, clock.as_ref(), &code, &user, scope)).await?;
    Ok(Json(status))
}
