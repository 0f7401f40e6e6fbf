//! Subscription lifecycle: time-based status transitions and reminder delivery.
//!
//! Status only moves forward, `active -> grace_period -> expired`. Every
//! notification is keyed by `(subscription, reminder_type)` in the reminder
//! log, which is the only record of whether it already happened. Running
//! either entry point twice in a row sends nothing the second time.

mod reminders;
mod transitions;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::REMINDER_CHANNEL;
use crate::error::RentSyncResult;
use crate::model::{NewReminder, ReminderType, Subscription, User};
use crate::push::{PushGateway, PushMessage, is_valid_push_token};
use crate::store::Store;

/// Result of one transition run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LifecycleSummary {
    pub moved_to_grace: usize,
    pub moved_to_expired: usize,
}

/// Result of one reminder run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReminderSummary {
    pub total_reminders_sent: usize,
    pub by_type: BTreeMap<ReminderType, usize>,
}

impl ReminderSummary {
    fn record(&mut self, reminder_type: ReminderType) {
        self.total_reminders_sent += 1;
        *self.by_type.entry(reminder_type).or_default() += 1;
    }
}

pub struct SubscriptionLifecycle {
    store: Arc<dyn Store>,
    push: Arc<dyn PushGateway>,
}

impl SubscriptionLifecycle {
    pub fn new(store: Arc<dyn Store>, push: Arc<dyn PushGateway>) -> Self {
        SubscriptionLifecycle { store, push }
    }

    /// Write the log row for `reminder_type` unless one exists.
    ///
    /// Returns `false` when the reminder was already logged.
    async fn claim(
        &self,
        sub: &Subscription,
        reminder_type: ReminderType,
        now: DateTime<Utc>,
    ) -> RentSyncResult<bool> {
        self.store
            .claim_reminder(&NewReminder {
                subscription_id: sub.id,
                user_id: sub.user_id,
                reminder_type,
                channel: REMINDER_CHANNEL.to_string(),
                sent_at: now,
            })
            .await
    }

    /// Build the notification for the subscription owner, if they have a
    /// usable push token.
    async fn message_for(
        &self,
        sub: &Subscription,
        reminder_type: ReminderType,
    ) -> RentSyncResult<Option<PushMessage>> {
        let user = self.store.find_user(sub.user_id).await?;
        Ok(user.and_then(|user| reminder_message(&user, sub, reminder_type)))
    }

    /// Deliver a batch, logging instead of failing.
    async fn deliver(&self, messages: &[PushMessage]) {
        if messages.is_empty() {
            return;
        }
        if let Err(e) = self.push.send(messages).await {
            tracing::warn!(error = %e, count = messages.len(), "push delivery failed");
        }
    }
}

fn reminder_message(
    user: &User,
    sub: &Subscription,
    reminder_type: ReminderType,
) -> Option<PushMessage> {
    let Some(token) = user
        .push_token
        .as_deref()
        .filter(|token| is_valid_push_token(token))
    else {
        tracing::debug!(user_id = %user.id, "no usable push token, skipping notification");
        return None;
    };

    Some(PushMessage::new(
        token,
        reminder_type.title(),
        reminder_type.body(),
        serde_json::json!({
            "type": "subscription_reminder",
            "reminderType": reminder_type,
            "subscriptionId": sub.id,
        }),
    ))
}
