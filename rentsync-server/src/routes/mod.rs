pub mod ical;
pub mod shared;
pub mod subscriptions;

use axum::{
    Json,
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rentsync_core::RentSyncError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Month-window rejection from the shared calendar
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitErrorResponse {
    pub error: String,
    pub limit: u32,
    pub is_paid: bool,
}

/// `{"success": true, ...body}`
#[derive(Serialize)]
pub struct Success<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(body: T) -> Json<Self> {
        Json(Success {
            success: true,
            body,
        })
    }
}

pub fn status_for(err: &RentSyncError) -> StatusCode {
    match err {
        RentSyncError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RentSyncError::NotFound(_) => StatusCode::NOT_FOUND,
        RentSyncError::Forbidden(_) | RentSyncError::MonthOutOfRange { .. } => {
            StatusCode::FORBIDDEN
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert engine errors to JSON HTTP responses
pub struct AppError(pub RentSyncError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if !self.0.is_rejection() {
            tracing::error!(error = %self.0, "request failed");
        }

        match self.0 {
            RentSyncError::MonthOutOfRange { limit, is_paid } => {
                let error = RentSyncError::MonthOutOfRange { limit, is_paid }.to_string();
                (
                    status,
                    Json(LimitErrorResponse {
                        error,
                        limit,
                        is_paid,
                    }),
                )
                    .into_response()
            }
            other => (
                status,
                Json(ErrorResponse {
                    error: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<RentSyncError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Parse a JSON body; an empty body yields `T::default()`.
pub fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_required_body(body)
}

/// Parse a JSON body that must be present.
pub fn parse_required_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        AppError(RentSyncError::InvalidRequest(format!(
            "Invalid request body: {e}"
        )))
    })
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
