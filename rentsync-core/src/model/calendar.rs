//! Property calendar rows: locked dates, iCal subscriptions, reservations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a locked date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockSource {
    Manual,
    External,
}

impl LockSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::External => "external",
        }
    }
}

/// A single day on which a property is unavailable
///
/// Unique on `(property_id, date, subscription_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedDate {
    pub id: Uuid,
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub reason: Option<String>,
    pub source: LockSource,
    /// External provider label, e.g. "Airbnb"
    pub source_name: Option<String>,
    /// UID of the originating iCal event; `None` for manual locks
    pub external_uid: Option<String>,
    /// iCal subscription that created the row; `None` for manual locks
    pub subscription_id: Option<Uuid>,
}

/// Locked date to upsert on the `(property_id, date, subscription_id)` key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLockedDate {
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub reason: Option<String>,
    pub source: LockSource,
    pub source_name: Option<String>,
    pub external_uid: Option<String>,
    pub subscription_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

/// An external calendar feed attached to a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcalSubscription {
    pub id: Uuid,
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub feed_url: String,
    pub source_name: String,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_status: Option<SyncStatus>,
    pub last_error_message: Option<String>,
}

/// Post-sync status written back to an [`IcalSubscription`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub last_synced_at: DateTime<Utc>,
    pub last_sync_status: SyncStatus,
    pub last_error_message: Option<String>,
}

impl SyncOutcome {
    pub fn success(at: DateTime<Utc>) -> Self {
        SyncOutcome {
            last_synced_at: at,
            last_sync_status: SyncStatus::Success,
            last_error_message: None,
        }
    }

    pub fn failure(at: DateTime<Utc>, message: impl Into<String>) -> Self {
        SyncOutcome {
            last_synced_at: at,
            last_sync_status: SyncStatus::Error,
            last_error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    /// Whether the reservation still occupies its nights.
    pub const fn blocks_dates(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::NoShow)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub property_id: Uuid,
    pub guest_name: Option<String>,
    pub check_in: NaiveDate,
    /// Exclusive: the guest leaves on this day
    pub check_out: NaiveDate,
    pub status: ReservationStatus,
}
