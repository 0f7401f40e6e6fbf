//! Public access tokens for shared calendars and outbound iCal feeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RentSyncError;

/// An opaque token granting read-only access to one property's calendar.
///
/// Both `calendar_share_tokens` and `ical_feed_tokens` rows map onto this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: i64,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

/// Why a token lookup was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    NotFound,
    Deactivated,
    Expired,
}

impl TokenRejection {
    pub const fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "Calendar link not found",
            Self::Deactivated => "This calendar link has been deactivated",
            Self::Expired => "This calendar link has expired",
        }
    }
}

impl From<TokenRejection> for RentSyncError {
    fn from(rejection: TokenRejection) -> Self {
        match rejection {
            TokenRejection::NotFound => RentSyncError::NotFound(rejection.message().into()),
            TokenRejection::Deactivated | TokenRejection::Expired => {
                RentSyncError::Forbidden(rejection.message().into())
            }
        }
    }
}

impl AccessToken {
    /// Validate a looked-up token at `now`.
    pub fn check(found: Option<Self>, now: DateTime<Utc>) -> Result<Self, TokenRejection> {
        let token = found.ok_or(TokenRejection::NotFound)?;
        if !token.is_active {
            return Err(TokenRejection::Deactivated);
        }
        if token.expires_at.is_some_and(|expires_at| expires_at < now) {
            return Err(TokenRejection::Expired);
        }
        Ok(token)
    }
}
