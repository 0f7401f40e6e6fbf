//! In-process store with the same uniqueness rules as the database.

use std::collections::HashMap;
#[cfg(feature = "test-util")]
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{RentSyncError, RentSyncResult};
use crate::model::*;
use crate::store::{StatusChange, Store, SubscriptionPatch, SubscriptionQuery, UserPatch};

#[derive(Default)]
struct Tables {
    subscriptions: HashMap<Uuid, Subscription>,
    users: HashMap<Uuid, User>,
    plans: HashMap<Uuid, Plan>,
    reminders: Vec<SubscriptionReminder>,
    ical_subscriptions: HashMap<Uuid, IcalSubscription>,
    locked_dates: Vec<LockedDate>,
    properties: HashMap<Uuid, Property>,
    reservations: Vec<Reservation>,
    share_tokens: HashMap<String, AccessToken>,
    feed_tokens: HashMap<String, AccessToken>,
    #[cfg(feature = "test-util")]
    faults: Faults,
}

/// Injected failures for exercising error paths.
#[cfg(feature = "test-util")]
#[derive(Default)]
struct Faults {
    unavailable: bool,
    rejected_dates: HashSet<NaiveDate>,
    subscription_updates: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the tables for a store call, failing if the store is marked down.
    fn open(&self) -> RentSyncResult<MutexGuard<'_, Tables>> {
        let tables = self.tables();
        #[cfg(feature = "test-util")]
        if tables.faults.unavailable {
            return Err(RentSyncError::Store("data store unavailable".into()));
        }
        Ok(tables)
    }

    /// Make every subsequent call fail, as if the backend were unreachable.
    #[cfg(feature = "test-util")]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.tables().faults.unavailable = unavailable;
    }

    /// Make any upsert touching `date` fail (the database rejecting a row).
    #[cfg(feature = "test-util")]
    pub fn reject_locked_date(&self, date: NaiveDate) {
        self.tables().faults.rejected_dates.insert(date);
    }

    /// Make `update_subscription` fail while other writes still succeed.
    #[cfg(feature = "test-util")]
    pub fn fail_subscription_updates(&self) {
        self.tables().faults.subscription_updates = true;
    }

    pub fn insert_subscription(&self, sub: Subscription) {
        self.tables().subscriptions.insert(sub.id, sub);
    }

    pub fn insert_user(&self, user: User) {
        self.tables().users.insert(user.id, user);
    }

    pub fn insert_plan(&self, plan: Plan) {
        self.tables().plans.insert(plan.id, plan);
    }

    pub fn insert_reminder(&self, reminder: SubscriptionReminder) {
        self.tables().reminders.push(reminder);
    }

    pub fn insert_ical_subscription(&self, sub: IcalSubscription) {
        self.tables().ical_subscriptions.insert(sub.id, sub);
    }

    pub fn insert_locked_date(&self, row: LockedDate) {
        self.tables().locked_dates.push(row);
    }

    pub fn insert_property(&self, property: Property) {
        self.tables().properties.insert(property.id, property);
    }

    pub fn insert_reservation(&self, reservation: Reservation) {
        self.tables().reservations.push(reservation);
    }

    pub fn insert_share_token(&self, token: AccessToken) {
        self.tables().share_tokens.insert(token.token.clone(), token);
    }

    pub fn insert_feed_token(&self, token: AccessToken) {
        self.tables().feed_tokens.insert(token.token.clone(), token);
    }

    pub fn subscription(&self, id: Uuid) -> Option<Subscription> {
        self.tables().subscriptions.get(&id).cloned()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.tables().users.get(&id).cloned()
    }

    pub fn reminders(&self) -> Vec<SubscriptionReminder> {
        self.tables().reminders.clone()
    }

    pub fn ical_subscription(&self, id: Uuid) -> Option<IcalSubscription> {
        self.tables().ical_subscriptions.get(&id).cloned()
    }

    /// Locked dates sorted by date.
    pub fn locked_dates(&self) -> Vec<LockedDate> {
        let mut rows = self.tables().locked_dates.clone();
        rows.sort_by_key(|row| row.date);
        rows
    }

    pub fn share_token(&self, token: &str) -> Option<AccessToken> {
        self.tables().share_tokens.get(token).cloned()
    }
}

fn apply_subscription_patch(sub: &mut Subscription, patch: &SubscriptionPatch) {
    if let Some(status) = patch.status {
        sub.status = status;
    }
    if let Some(grace_period_end) = patch.grace_period_end {
        sub.grace_period_end = Some(grace_period_end);
    }
    if let Some(reminder_type) = patch.last_reminder_type {
        sub.last_reminder_type = Some(reminder_type);
    }
    if let Some(sent_at) = patch.reminder_sent_at {
        sub.reminder_sent_at = Some(sent_at);
    }
}

fn apply_user_patch(user: &mut User, patch: &UserPatch) {
    if let Some(status) = patch.subscription_status {
        user.subscription_status = Some(status);
    }
    if let Some(limit) = patch.property_limit {
        user.property_limit = limit;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> RentSyncResult<Vec<Subscription>> {
        let tables = self.open()?;
        let mut found: Vec<Subscription> = tables
            .subscriptions
            .values()
            .filter(|sub| query.matches(sub))
            .cloned()
            .collect();
        found.sort_by_key(|sub| (sub.current_period_end, sub.id));
        Ok(found)
    }

    async fn update_subscription(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
    ) -> RentSyncResult<()> {
        let mut tables = self.open()?;
        #[cfg(feature = "test-util")]
        if tables.faults.subscription_updates {
            return Err(RentSyncError::Store(format!("update of subscription {id} failed")));
        }
        if let Some(sub) = tables.subscriptions.get_mut(&id) {
            apply_subscription_patch(sub, patch);
        }
        Ok(())
    }

    async fn transition_subscription(&self, change: &StatusChange) -> RentSyncResult<()> {
        let mut tables = self.open()?;
        if let Some(sub) = tables.subscriptions.get_mut(&change.subscription_id) {
            apply_subscription_patch(sub, &change.subscription);
        }
        if let Some(user) = tables.users.get_mut(&change.user_id) {
            apply_user_patch(user, &change.user);
        }
        Ok(())
    }

    async fn find_entitled_subscription(
        &self,
        user_id: Uuid,
    ) -> RentSyncResult<Option<Subscription>> {
        let tables = self.open()?;
        Ok(tables
            .subscriptions
            .values()
            .filter(|sub| sub.user_id == user_id && sub.status.is_entitled())
            .max_by_key(|sub| sub.current_period_start)
            .cloned())
    }

    async fn find_plan(&self, id: Uuid) -> RentSyncResult<Option<Plan>> {
        Ok(self.open()?.plans.get(&id).cloned())
    }

    async fn find_user(&self, id: Uuid) -> RentSyncResult<Option<User>> {
        Ok(self.open()?.users.get(&id).cloned())
    }

    async fn reminder_exists(
        &self,
        subscription_id: Uuid,
        reminder_type: ReminderType,
    ) -> RentSyncResult<bool> {
        Ok(self.open()?.reminders.iter().any(|r| {
            r.subscription_id == subscription_id && r.reminder_type == reminder_type
        }))
    }

    async fn claim_reminder(&self, reminder: &NewReminder) -> RentSyncResult<bool> {
        let mut tables = self.open()?;
        let taken = tables.reminders.iter().any(|r| {
            r.subscription_id == reminder.subscription_id
                && r.reminder_type == reminder.reminder_type
        });
        if taken {
            return Ok(false);
        }
        tables.reminders.push(SubscriptionReminder {
            id: Uuid::new_v4(),
            subscription_id: reminder.subscription_id,
            user_id: reminder.user_id,
            reminder_type: reminder.reminder_type,
            channel: reminder.channel.clone(),
            sent_at: reminder.sent_at,
        });
        Ok(true)
    }

    async fn find_ical_subscription(&self, id: Uuid) -> RentSyncResult<Option<IcalSubscription>> {
        Ok(self.open()?.ical_subscriptions.get(&id).cloned())
    }

    async fn active_ical_subscriptions(&self) -> RentSyncResult<Vec<IcalSubscription>> {
        let tables = self.open()?;
        let mut subs: Vec<IcalSubscription> = tables
            .ical_subscriptions
            .values()
            .filter(|sub| sub.is_active)
            .cloned()
            .collect();
        subs.sort_by_key(|sub| sub.id);
        Ok(subs)
    }

    async fn record_sync_outcome(&self, id: Uuid, outcome: &SyncOutcome) -> RentSyncResult<()> {
        let mut tables = self.open()?;
        if let Some(sub) = tables.ical_subscriptions.get_mut(&id) {
            sub.last_synced_at = Some(outcome.last_synced_at);
            sub.last_sync_status = Some(outcome.last_sync_status);
            sub.last_error_message = outcome.last_error_message.clone();
        }
        Ok(())
    }

    async fn external_locked_dates(
        &self,
        subscription_id: Uuid,
    ) -> RentSyncResult<Vec<LockedDate>> {
        Ok(self
            .open()?
            .locked_dates
            .iter()
            .filter(|row| {
                row.source == LockSource::External && row.subscription_id == Some(subscription_id)
            })
            .cloned()
            .collect())
    }

    async fn manual_locked_dates(&self, property_id: Uuid) -> RentSyncResult<Vec<LockedDate>> {
        Ok(self
            .open()?
            .locked_dates
            .iter()
            .filter(|row| row.property_id == property_id && row.source == LockSource::Manual)
            .cloned()
            .collect())
    }

    async fn locked_dates_between(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RentSyncResult<Vec<LockedDate>> {
        Ok(self
            .open()?
            .locked_dates
            .iter()
            .filter(|row| row.property_id == property_id && row.date >= from && row.date < to)
            .cloned()
            .collect())
    }

    async fn upsert_locked_dates(&self, rows: &[NewLockedDate]) -> RentSyncResult<()> {
        let mut tables = self.open()?;
        #[cfg(feature = "test-util")]
        if let Some(row) = rows
            .iter()
            .find(|row| tables.faults.rejected_dates.contains(&row.date))
        {
            return Err(RentSyncError::Store(format!(
                "row for {} violates a constraint",
                row.date
            )));
        }

        for row in rows {
            let position = tables.locked_dates.iter().position(|existing| {
                existing.property_id == row.property_id
                    && existing.date == row.date
                    && existing.subscription_id == row.subscription_id
            });
            match position {
                Some(index) => {
                    let existing = &mut tables.locked_dates[index];
                    existing.user_id = row.user_id;
                    existing.reason = row.reason.clone();
                    existing.source = row.source;
                    existing.source_name = row.source_name.clone();
                    existing.external_uid = row.external_uid.clone();
                }
                None => tables.locked_dates.push(LockedDate {
                    id: Uuid::new_v4(),
                    property_id: row.property_id,
                    user_id: row.user_id,
                    date: row.date,
                    reason: row.reason.clone(),
                    source: row.source,
                    source_name: row.source_name.clone(),
                    external_uid: row.external_uid.clone(),
                    subscription_id: row.subscription_id,
                }),
            }
        }
        Ok(())
    }

    async fn delete_locked_dates(&self, ids: &[Uuid]) -> RentSyncResult<()> {
        let mut tables = self.open()?;
        tables.locked_dates.retain(|row| !ids.contains(&row.id));
        Ok(())
    }

    async fn find_property(&self, id: Uuid) -> RentSyncResult<Option<Property>> {
        Ok(self.open()?.properties.get(&id).cloned())
    }

    async fn reservations_for_property(
        &self,
        property_id: Uuid,
    ) -> RentSyncResult<Vec<Reservation>> {
        Ok(self
            .open()?
            .reservations
            .iter()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn reservations_overlapping(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RentSyncResult<Vec<Reservation>> {
        Ok(self
            .open()?
            .reservations
            .iter()
            .filter(|r| r.property_id == property_id && r.check_in < to && r.check_out > from)
            .cloned()
            .collect())
    }

    async fn find_share_token(&self, token: &str) -> RentSyncResult<Option<AccessToken>> {
        Ok(self.open()?.share_tokens.get(token).cloned())
    }

    async fn find_feed_token(&self, token: &str) -> RentSyncResult<Option<AccessToken>> {
        Ok(self.open()?.feed_tokens.get(token).cloned())
    }

    async fn record_share_view(
        &self,
        token: &str,
        view_count: i64,
        viewed_at: DateTime<Utc>,
    ) -> RentSyncResult<()> {
        let mut tables = self.open()?;
        if let Some(row) = tables.share_tokens.get_mut(token) {
            row.view_count = view_count;
            row.last_viewed_at = Some(viewed_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_row(property_id: Uuid, subscription_id: Uuid, day: u32, uid: &str) -> NewLockedDate {
        NewLockedDate {
            property_id,
            user_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            reason: None,
            source: LockSource::External,
            source_name: Some("Airbnb".to_string()),
            external_uid: Some(uid.to_string()),
            subscription_id: Some(subscription_id),
        }
    }

    #[tokio::test]
    async fn test_upsert_respects_conflict_key() {
        let store = MemoryStore::new();
        let property = Uuid::new_v4();
        let (feed_a, feed_b) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .upsert_locked_dates(&[new_row(property, feed_a, 1, "a")])
            .await
            .unwrap();
        store
            .upsert_locked_dates(&[new_row(property, feed_a, 1, "a2")])
            .await
            .unwrap();
        store
            .upsert_locked_dates(&[new_row(property, feed_b, 1, "b")])
            .await
            .unwrap();

        let rows = store.locked_dates();
        assert_eq!(rows.len(), 2, "Same date from two feeds should not collide");
        let from_a: Vec<_> = rows
            .iter()
            .filter(|r| r.subscription_id == Some(feed_a))
            .collect();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].external_uid.as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn test_claim_reminder_only_once() {
        let store = MemoryStore::new();
        let reminder = NewReminder {
            subscription_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            reminder_type: ReminderType::Expired,
            channel: "push".to_string(),
            sent_at: Utc::now(),
        };

        assert!(store.claim_reminder(&reminder).await.unwrap());
        assert!(!store.claim_reminder(&reminder).await.unwrap());
        assert_eq!(store.reminders().len(), 1);
    }

    #[cfg(feature = "test-util")]
    #[tokio::test]
    async fn test_rejected_date_fails_whole_batch() {
        let store = MemoryStore::new();
        let property = Uuid::new_v4();
        let feed = Uuid::new_v4();
        store.reject_locked_date(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());

        let result = store
            .upsert_locked_dates(&[
                new_row(property, feed, 1, "a"),
                new_row(property, feed, 2, "a"),
            ])
            .await;

        assert!(result.is_err());
        assert!(store.locked_dates().is_empty());
    }
}
