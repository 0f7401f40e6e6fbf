//! iCal sync trigger and outbound feed endpoints

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use rentsync_core::publish::token_from_filename;
use rentsync_core::sync::SyncRun;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::{AppError, Success, parse_body, status_for};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ical/sync", post(sync))
        .route("/ical/feed", get(feed_by_query))
        .route("/ical/feed/{file}", get(feed_by_filename))
}

/// Request body for a sync run
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub subscription_id: Option<Uuid>,
}

/// POST /ical/sync - Sync one subscription, or all active ones
async fn sync(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Success<SyncRun>>, AppError> {
    let request: SyncRequest = parse_body(&body)?;
    let now = Utc::now();

    let run = match request.subscription_id {
        Some(id) => state.sync.sync_one(id, now).await?,
        None => state.sync.sync_all(now).await?,
    };
    Ok(Success::new(run))
}

#[derive(Deserialize)]
pub struct FeedQuery {
    pub token: Option<String>,
}

/// GET /ical/feed?token=... - Render a property's feed
async fn feed_by_query(State(state): State<AppState>, Query(query): Query<FeedQuery>) -> Response {
    render_feed(&state, query.token.as_deref()).await
}

/// GET /ical/feed/{token}.ics - Same feed, addressable as a file
async fn feed_by_filename(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    render_feed(&state, token_from_filename(&file)).await
}

/// Feed responses are for calendar clients, so errors are plain text.
async fn render_feed(state: &AppState, token: Option<&str>) -> Response {
    match state.publisher.render(token, Utc::now()).await {
        Ok(feed) => (
            [
                (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", feed.filename),
                ),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            feed.body,
        )
            .into_response(),
        Err(e) => {
            if !e.is_rejection() {
                tracing::error!(error = %e, "feed render failed");
            }
            (status_for(&e), e.to_string()).into_response()
        }
    }
}
