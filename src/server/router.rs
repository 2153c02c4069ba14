//! HTTP router construction.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use super::{api, AppState};

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/signup/", post(api::signup))
        .route("/signin/", post(api::signin))
        .route("/income/", get(api::list_incomes).post(api::create_income))
        .route("/income/{id}", put(api::update_income).delete(api::delete_income))
        .route("/expense/", get(api::list_expenses).post(api::create_expense))
        .route("/expense/{id}", put(api::update_expense).delete(api::delete_expense))
        .route("/financial-summary/", get(api::financial_summary))
        .route("/upload/status/{code}", get(api::upload_status))
        .route("/upload/{kind}", post(api::upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
