//! Subscription, reminder and user rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription status
///
/// The lifecycle engine only ever moves a subscription forward along
/// `Active -> GracePeriod -> Expired`. `Cancelled` is set elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    GracePeriod,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::GracePeriod => "grace_period",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the owner still holds plan entitlements in this state.
    pub const fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::GracePeriod)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    /// Set once, when the subscription enters the grace period
    pub grace_period_end: Option<DateTime<Utc>>,
    pub last_reminder_type: Option<ReminderType>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
}

/// Idempotence key for subscription notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    #[serde(rename = "expiring_7_days")]
    Expiring7Days,
    #[serde(rename = "expiring_3_days")]
    Expiring3Days,
    #[serde(rename = "expiring_1_day")]
    Expiring1Day,
    GracePeriodStart,
    #[serde(rename = "grace_period_day_2")]
    GracePeriodDay2,
    GracePeriodFinal,
    Expired,
}

impl ReminderType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expiring7Days => "expiring_7_days",
            Self::Expiring3Days => "expiring_3_days",
            Self::Expiring1Day => "expiring_1_day",
            Self::GracePeriodStart => "grace_period_start",
            Self::GracePeriodDay2 => "grace_period_day_2",
            Self::GracePeriodFinal => "grace_period_final",
            Self::Expired => "expired",
        }
    }

    /// Pre-expiry reminder for a given number of days before `current_period_end`.
    pub const fn expiring_in(days: i64) -> Option<Self> {
        match days {
            7 => Some(Self::Expiring7Days),
            3 => Some(Self::Expiring3Days),
            1 => Some(Self::Expiring1Day),
            _ => None,
        }
    }

    /// Grace-period reminder for whole days elapsed since `current_period_end`.
    ///
    /// Day 0 is covered by the grace transition itself.
    pub const fn grace_day(days_since_expiry: i64) -> Option<Self> {
        match days_since_expiry {
            1 => Some(Self::GracePeriodDay2),
            2 => Some(Self::GracePeriodFinal),
            _ => None,
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Self::Expiring7Days => "Your subscription renews in 7 days",
            Self::Expiring3Days => "Your subscription expires in 3 days",
            Self::Expiring1Day => "Your subscription expires tomorrow",
            Self::GracePeriodStart => "Your subscription has expired",
            Self::GracePeriodDay2 => "2 days left to renew",
            Self::GracePeriodFinal => "Last day to renew",
            Self::Expired => "Your subscription has ended",
        }
    }

    pub const fn body(&self) -> &'static str {
        match self {
            Self::Expiring7Days => {
                "Renew now to keep uninterrupted access to all your properties."
            }
            Self::Expiring3Days => "Renew soon so your calendars and properties stay active.",
            Self::Expiring1Day => "Renew today to avoid losing premium features.",
            Self::GracePeriodStart => {
                "You have 3 days of grace period to renew before premium features are removed."
            }
            Self::GracePeriodDay2 => "Your grace period ends in 2 days. Renew to keep your plan.",
            Self::GracePeriodFinal => {
                "Today is the last day of your grace period. Renew now to keep your properties."
            }
            Self::Expired => "Your account is now on the free plan with a single property.",
        }
    }
}

impl std::fmt::Display for ReminderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatched reminder (append-only log)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionReminder {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub reminder_type: ReminderType,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
}

/// Reminder log row to insert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReminder {
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub reminder_type: ReminderType,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
}

/// The user fields the engine reads and mirrors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub push_token: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub property_limit: i32,
    /// `None` = plan default, `-1` = unlimited, otherwise a month count
    #[serde(default)]
    pub calendar_months_override: Option<i32>,
}

/// Subscription plan entitlements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    /// `None` = free default, `-1` = unlimited
    pub calendar_months_limit: Option<i32>,
}
