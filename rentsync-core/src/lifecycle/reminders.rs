use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::constants::EXPIRY_REMINDER_DAYS;
use crate::error::{RentSyncError, RentSyncResult};
use crate::lifecycle::{ReminderSummary, SubscriptionLifecycle, reminder_message};
use crate::model::{ReminderType, Subscription, SubscriptionStatus};
use crate::store::{SubscriptionPatch, SubscriptionQuery};

/// The UTC calendar day `days` days after `now`, as `[start, end)`.
fn utc_day_after(now: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = (now + Duration::days(days))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();
    (start, start + Duration::days(1))
}

impl SubscriptionLifecycle {
    /// Send the renewal reminders each subscription is currently due.
    ///
    /// Runs the pre-expiry ladder for active subscriptions, then the
    /// day-based reminders for subscriptions in their grace period. A failed
    /// listing query skips only its own pass; the run fails when all of them
    /// fail.
    pub async fn send_reminders(&self, now: DateTime<Utc>) -> RentSyncResult<ReminderSummary> {
        let mut summary = ReminderSummary::default();
        let mut listed = false;
        let mut last_error: Option<RentSyncError> = None;

        for days in EXPIRY_REMINDER_DAYS {
            let Some(reminder_type) = ReminderType::expiring_in(days) else {
                continue;
            };
            let (day_start, day_end) = utc_day_after(now, days);
            let query = SubscriptionQuery::with_status(SubscriptionStatus::Active)
                .period_end_from(day_start)
                .period_end_before(day_end);

            let due = match self.store.find_subscriptions(&query).await {
                Ok(due) => {
                    listed = true;
                    due
                }
                Err(e) => {
                    tracing::warn!(days, error = %e, "skipping expiry reminder threshold");
                    last_error = Some(e);
                    continue;
                }
            };

            for sub in &due {
                match self.send_expiry_reminder(sub, reminder_type, now).await {
                    Ok(true) => summary.record(reminder_type),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(
                        subscription_id = %sub.id,
                        reminder_type = %reminder_type,
                        error = %e,
                        "failed to send expiry reminder"
                    ),
                }
            }
        }

        match self
            .store
            .find_subscriptions(&SubscriptionQuery::with_status(SubscriptionStatus::GracePeriod))
            .await
        {
            Ok(in_grace) => {
                listed = true;
                for sub in &in_grace {
                    let days_since_expiry = (now - sub.current_period_end).num_days();
                    let Some(reminder_type) = ReminderType::grace_day(days_since_expiry) else {
                        continue;
                    };
                    match self.send_grace_reminder(sub, reminder_type, now).await {
                        Ok(true) => summary.record(reminder_type),
                        Ok(false) => {}
                        Err(e) => tracing::warn!(
                            subscription_id = %sub.id,
                            reminder_type = %reminder_type,
                            error = %e,
                            "failed to send grace period reminder"
                        ),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping grace period reminders");
                last_error = Some(e);
            }
        }

        if let (false, Some(e)) = (listed, last_error) {
            return Err(e);
        }

        tracing::info!(
            total = summary.total_reminders_sent,
            "subscription reminder run complete"
        );
        Ok(summary)
    }

    /// Pre-expiry reminders are only logged once they can actually be pushed.
    async fn send_expiry_reminder(
        &self,
        sub: &Subscription,
        reminder_type: ReminderType,
        now: DateTime<Utc>,
    ) -> RentSyncResult<bool> {
        if self.store.reminder_exists(sub.id, reminder_type).await? {
            return Ok(false);
        }

        let Some(message) = self.message_for(sub, reminder_type).await? else {
            return Ok(false);
        };

        if !self.claim(sub, reminder_type, now).await? {
            return Ok(false);
        }
        self.mark_sent(sub, reminder_type, now).await;
        self.deliver(&[message]).await;
        Ok(true)
    }

    /// Grace reminders are logged whether or not a push can be delivered.
    ///
    /// Returns whether a push was dispatched.
    async fn send_grace_reminder(
        &self,
        sub: &Subscription,
        reminder_type: ReminderType,
        now: DateTime<Utc>,
    ) -> RentSyncResult<bool> {
        if self.store.reminder_exists(sub.id, reminder_type).await? {
            return Ok(false);
        }
        if !self.claim(sub, reminder_type, now).await? {
            return Ok(false);
        }
        self.mark_sent(sub, reminder_type, now).await;

        // The log row is written, so this is the only chance to push.
        let user = match self.store.find_user(sub.user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(
                    user_id = %sub.user_id,
                    error = %e,
                    "failed to load user for reminder"
                );
                return Ok(false);
            }
        };
        match user.and_then(|user| reminder_message(&user, sub, reminder_type)) {
            Some(message) => {
                self.deliver(&[message]).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stamp `last_reminder_type`. The reminder log row is already written,
    /// so a failure here is logged and the push still goes out.
    async fn mark_sent(&self, sub: &Subscription, reminder_type: ReminderType, now: DateTime<Utc>) {
        let patch = SubscriptionPatch {
            last_reminder_type: Some(reminder_type),
            reminder_sent_at: Some(now),
            ..Default::default()
        };
        if let Err(e) = self.store.update_subscription(sub.id, &patch).await {
            tracing::warn!(
                subscription_id = %sub.id,
                reminder_type = %reminder_type,
                error = %e,
                "failed to stamp reminder on subscription"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_utc_day_after_ignores_time_of_day() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 22, 30, 0).unwrap();
        let (start, end) = utc_day_after(now, 7);

        assert_eq!(start, Utc.with_ymd_and_hms(2026, 4, 8, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 4, 9, 0, 0, 0).unwrap());
    }
}
