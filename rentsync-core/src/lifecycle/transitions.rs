use chrono::{DateTime, Duration, Utc};

use crate::constants::{FREE_PROPERTY_LIMIT, GRACE_PERIOD_DAYS};
use crate::error::RentSyncResult;
use crate::lifecycle::{LifecycleSummary, SubscriptionLifecycle};
use crate::model::{ReminderType, Subscription, SubscriptionStatus};
use crate::push::PushMessage;
use crate::store::{StatusChange, SubscriptionPatch, SubscriptionQuery, UserPatch};

impl SubscriptionLifecycle {
    /// Move lapsed subscriptions into the grace period and expire the ones
    /// whose grace period has run out.
    ///
    /// Fails only if the store cannot be queried at all; individual
    /// subscriptions that fail are logged and skipped.
    pub async fn advance(&self, now: DateTime<Utc>) -> RentSyncResult<LifecycleSummary> {
        let mut summary = LifecycleSummary::default();
        let mut outbox = Vec::new();

        let lapsed = self
            .store
            .find_subscriptions(
                &SubscriptionQuery::with_status(SubscriptionStatus::Active).period_end_before(now),
            )
            .await?;

        for sub in &lapsed {
            match self.enter_grace(sub, now, &mut outbox).await {
                Ok(()) => summary.moved_to_grace += 1,
                Err(e) => tracing::warn!(
                    subscription_id = %sub.id,
                    error = %e,
                    "failed to move subscription into grace period"
                ),
            }
        }

        let ended = self
            .store
            .find_subscriptions(
                &SubscriptionQuery::with_status(SubscriptionStatus::GracePeriod)
                    .grace_end_before(now),
            )
            .await;

        match ended {
            Ok(ended) => {
                for sub in &ended {
                    match self.expire(sub, now, &mut outbox).await {
                        Ok(()) => summary.moved_to_expired += 1,
                        Err(e) => tracing::warn!(
                            subscription_id = %sub.id,
                            error = %e,
                            "failed to expire subscription"
                        ),
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to list ended grace periods"),
        }

        self.deliver(&outbox).await;

        tracing::info!(
            moved_to_grace = summary.moved_to_grace,
            moved_to_expired = summary.moved_to_expired,
            "subscription lifecycle run complete"
        );
        Ok(summary)
    }

    async fn enter_grace(
        &self,
        sub: &Subscription,
        now: DateTime<Utc>,
        outbox: &mut Vec<PushMessage>,
    ) -> RentSyncResult<()> {
        self.store
            .transition_subscription(&StatusChange {
                subscription_id: sub.id,
                user_id: sub.user_id,
                subscription: SubscriptionPatch {
                    status: Some(SubscriptionStatus::GracePeriod),
                    grace_period_end: Some(now + Duration::days(GRACE_PERIOD_DAYS)),
                    last_reminder_type: Some(ReminderType::GracePeriodStart),
                    reminder_sent_at: Some(now),
                },
                user: UserPatch {
                    subscription_status: Some(SubscriptionStatus::GracePeriod),
                    property_limit: None,
                },
            })
            .await?;

        self.queue_notice(sub, ReminderType::GracePeriodStart, now, outbox)
            .await;
        Ok(())
    }

    async fn expire(
        &self,
        sub: &Subscription,
        now: DateTime<Utc>,
        outbox: &mut Vec<PushMessage>,
    ) -> RentSyncResult<()> {
        self.store
            .transition_subscription(&StatusChange {
                subscription_id: sub.id,
                user_id: sub.user_id,
                subscription: SubscriptionPatch {
                    status: Some(SubscriptionStatus::Expired),
                    grace_period_end: None,
                    last_reminder_type: Some(ReminderType::Expired),
                    reminder_sent_at: Some(now),
                },
                user: UserPatch {
                    subscription_status: Some(SubscriptionStatus::Expired),
                    property_limit: Some(FREE_PROPERTY_LIMIT),
                },
            })
            .await?;

        self.queue_notice(sub, ReminderType::Expired, now, outbox)
            .await;
        Ok(())
    }

    /// Log a transition notice and queue its push. The transition itself has
    /// already been written, so failures here are only logged.
    async fn queue_notice(
        &self,
        sub: &Subscription,
        reminder_type: ReminderType,
        now: DateTime<Utc>,
        outbox: &mut Vec<PushMessage>,
    ) {
        match self.claim(sub, reminder_type, now).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::warn!(
                    subscription_id = %sub.id,
                    reminder_type = %reminder_type,
                    error = %e,
                    "failed to log transition notice"
                );
                return;
            }
        }

        match self.message_for(sub, reminder_type).await {
            Ok(Some(message)) => outbox.push(message),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                user_id = %sub.user_id,
                error = %e,
                "failed to load user for notification"
            ),
        }
    }
}
