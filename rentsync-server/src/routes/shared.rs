//! Public shared-calendar endpoint

use axum::{Json, Router, body::Bytes, extract::State, routing::post};
use chrono::Utc;
use rentsync_core::share::{ShareRequest, SharedCalendarView};

use crate::routes::{AppError, parse_required_body};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/calendar/shared", post(open_shared))
}

/// POST /calendar/shared - Read one month of a shared calendar
async fn open_shared(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SharedCalendarView>, AppError> {
    let request: ShareRequest = parse_required_body(&body)?;
    let view = state.share.open(&request, Utc::now()).await?;
    Ok(Json(view))
}
