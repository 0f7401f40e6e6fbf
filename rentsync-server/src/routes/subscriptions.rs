//! Scheduler endpoints for the subscription lifecycle

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use rentsync_core::lifecycle::{LifecycleSummary, ReminderSummary};

use crate::routes::{AppError, Success};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/lifecycle", post(advance))
        .route("/subscriptions/reminders", post(send_reminders))
}

/// POST /subscriptions/lifecycle - Run status transitions
async fn advance(
    State(state): State<AppState>,
) -> Result<Json<Success<LifecycleSummary>>, AppError> {
    let summary = state.lifecycle.advance(Utc::now()).await?;
    Ok(Success::new(summary))
}

/// POST /subscriptions/reminders - Send due renewal reminders
async fn send_reminders(
    State(state): State<AppState>,
) -> Result<Json<Success<ReminderSummary>>, AppError> {
    let summary = state.lifecycle.send_reminders(Utc::now()).await?;
    Ok(Success::new(summary))
}
