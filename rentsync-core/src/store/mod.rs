//! Data store interface.
//!
//! The managed backend is treated as a black box: filtered selects, inserts,
//! patches, upserts on a conflict key and deletes by id set. [`RestStore`]
//! talks to it over PostgREST; [`MemoryStore`] keeps everything in process.

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RentSyncResult;
use crate::model::*;

/// Filter over the `subscriptions` table.
///
/// All bounds are optional; `period_end_from` is inclusive, the `*_before`
/// bounds are exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionQuery {
    pub status: SubscriptionStatus,
    pub period_end_from: Option<DateTime<Utc>>,
    pub period_end_before: Option<DateTime<Utc>>,
    pub grace_end_before: Option<DateTime<Utc>>,
}

impl SubscriptionQuery {
    pub fn with_status(status: SubscriptionStatus) -> Self {
        SubscriptionQuery {
            status,
            period_end_from: None,
            period_end_before: None,
            grace_end_before: None,
        }
    }

    pub fn period_end_from(mut self, from: DateTime<Utc>) -> Self {
        self.period_end_from = Some(from);
        self
    }

    pub fn period_end_before(mut self, before: DateTime<Utc>) -> Self {
        self.period_end_before = Some(before);
        self
    }

    pub fn grace_end_before(mut self, before: DateTime<Utc>) -> Self {
        self.grace_end_before = Some(before);
        self
    }

    pub fn matches(&self, sub: &Subscription) -> bool {
        if sub.status != self.status {
            return false;
        }
        if self
            .period_end_from
            .is_some_and(|from| sub.current_period_end < from)
        {
            return false;
        }
        if self
            .period_end_before
            .is_some_and(|before| sub.current_period_end >= before)
        {
            return false;
        }
        match (self.grace_end_before, sub.grace_period_end) {
            (Some(before), Some(grace_end)) => grace_end < before,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Partial update of a subscription row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubscriptionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reminder_type: Option<ReminderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_sent_at: Option<DateTime<Utc>>,
}

/// Partial update of the user fields mirrored from a subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_limit: Option<i32>,
}

/// A status transition together with its `users` read-model projection.
///
/// Stores apply both halves in one call so the mirror has a single writer.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub subscription: SubscriptionPatch,
    pub user: UserPatch,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Subscriptions

    async fn find_subscriptions(&self, query: &SubscriptionQuery)
    -> RentSyncResult<Vec<Subscription>>;

    async fn update_subscription(&self, id: Uuid, patch: &SubscriptionPatch)
    -> RentSyncResult<()>;

    /// Update a subscription and mirror its status onto the owning user.
    async fn transition_subscription(&self, change: &StatusChange) -> RentSyncResult<()>;

    /// Most recent active or grace-period subscription of a user.
    async fn find_entitled_subscription(&self, user_id: Uuid)
    -> RentSyncResult<Option<Subscription>>;

    async fn find_plan(&self, id: Uuid) -> RentSyncResult<Option<Plan>>;

    async fn find_user(&self, id: Uuid) -> RentSyncResult<Option<User>>;

    // Reminder log

    async fn reminder_exists(
        &self,
        subscription_id: Uuid,
        reminder_type: ReminderType,
    ) -> RentSyncResult<bool>;

    /// Insert-or-ignore on `(subscription_id, reminder_type)`.
    ///
    /// Returns `true` when this call created the row.
    async fn claim_reminder(&self, reminder: &NewReminder) -> RentSyncResult<bool>;

    // iCal subscriptions

    async fn find_ical_subscription(&self, id: Uuid) -> RentSyncResult<Option<IcalSubscription>>;

    async fn active_ical_subscriptions(&self) -> RentSyncResult<Vec<IcalSubscription>>;

    async fn record_sync_outcome(&self, id: Uuid, outcome: &SyncOutcome) -> RentSyncResult<()>;

    // Locked dates

    /// External rows created by one iCal subscription.
    async fn external_locked_dates(&self, subscription_id: Uuid)
    -> RentSyncResult<Vec<LockedDate>>;

    async fn manual_locked_dates(&self, property_id: Uuid) -> RentSyncResult<Vec<LockedDate>>;

    /// All locked dates of a property in `[from, to)`.
    async fn locked_dates_between(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RentSyncResult<Vec<LockedDate>>;

    /// Upsert on `(property_id, date, subscription_id)`.
    async fn upsert_locked_dates(&self, rows: &[NewLockedDate]) -> RentSyncResult<()>;

    async fn delete_locked_dates(&self, ids: &[Uuid]) -> RentSyncResult<()>;

    // Properties and reservations

    async fn find_property(&self, id: Uuid) -> RentSyncResult<Option<Property>>;

    async fn reservations_for_property(&self, property_id: Uuid)
    -> RentSyncResult<Vec<Reservation>>;

    /// Reservations with nights in `[from, to)`.
    async fn reservations_overlapping(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RentSyncResult<Vec<Reservation>>;

    // Access tokens

    async fn find_share_token(&self, token: &str) -> RentSyncResult<Option<AccessToken>>;

    async fn find_feed_token(&self, token: &str) -> RentSyncResult<Option<AccessToken>>;

    async fn record_share_view(
        &self,
        token: &str,
        view_count: i64,
        viewed_at: DateTime<Utc>,
    ) -> RentSyncResult<()>;
}
