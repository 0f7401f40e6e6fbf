//! Row builders for seeding a `MemoryStore`

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rentsync_core::model::*;
use uuid::Uuid;

pub const PUSH_TOKEN: &str = "ExponentPushToken[test-device]";

/// Fixed clock for every scenario: 2026-06-15 09:30 UTC
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 9, 30, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn user(push_token: Option<&str>) -> User {
    User {
        id: Uuid::new_v4(),
        full_name: Some("Test Owner".into()),
        push_token: push_token.map(String::from),
        subscription_status: Some(SubscriptionStatus::Active),
        property_limit: 5,
        calendar_months_override: None,
    }
}

pub fn subscription(
    user_id: Uuid,
    status: SubscriptionStatus,
    current_period_end: DateTime<Utc>,
) -> Subscription {
    Subscription {
        id: Uuid::new_v4(),
        user_id,
        plan_id: None,
        status,
        current_period_start: current_period_end - Duration::days(30),
        current_period_end,
        grace_period_end: None,
        last_reminder_type: None,
        reminder_sent_at: None,
    }
}

pub fn property(user_id: Uuid, name: &str) -> Property {
    Property {
        id: Uuid::new_v4(),
        user_id,
        name: name.into(),
    }
}

pub fn ical_subscription(property: &Property, feed_url: String) -> IcalSubscription {
    IcalSubscription {
        id: Uuid::new_v4(),
        property_id: property.id,
        user_id: property.user_id,
        feed_url,
        source_name: "Airbnb".into(),
        is_active: true,
        last_synced_at: None,
        last_sync_status: None,
        last_error_message: None,
    }
}

pub fn manual_lock(property: &Property, day: NaiveDate, reason: &str) -> LockedDate {
    LockedDate {
        id: Uuid::new_v4(),
        property_id: property.id,
        user_id: property.user_id,
        date: day,
        reason: Some(reason.into()),
        source: LockSource::Manual,
        source_name: None,
        external_uid: None,
        subscription_id: None,
    }
}

pub fn reservation(
    property: &Property,
    check_in: NaiveDate,
    check_out: NaiveDate,
    status: ReservationStatus,
) -> Reservation {
    Reservation {
        id: Uuid::new_v4(),
        property_id: property.id,
        guest_name: Some("Guest".into()),
        check_in,
        check_out,
        status,
    }
}

pub fn access_token(property: &Property, token: &str) -> AccessToken {
    AccessToken {
        token: token.into(),
        property_id: property.id,
        user_id: property.user_id,
        is_active: true,
        expires_at: None,
        view_count: 0,
        last_viewed_at: None,
    }
}

/// Wrap VEVENT bodies in a calendar, `(uid, dtstart, dtend)` each.
pub fn feed(events: &[(&str, &str, &str)]) -> String {
    let mut ics = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//Feed//EN\r\n");
    for (uid, start, end) in events {
        ics.push_str(&format!(
            "BEGIN:VEVENT\r\nUID:{uid}\r\n\
             DTSTART;VALUE=DATE:{start}\r\nDTEND;VALUE=DATE:{end}\r\n\
             SUMMARY:Reserved\r\nEND:VEVENT\r\n"
        ));
    }
    ics.push_str("END:VCALENDAR\r\n");
    ics
}
