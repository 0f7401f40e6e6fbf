use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::ics::FeedEvent;
use crate::model::{IcalSubscription, LockSource, LockedDate, NewLockedDate};

/// What one sync has to write so the stored locks match the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    /// One row per covered date, upserted on `(property_id, date, subscription_id)`
    pub rows: Vec<NewLockedDate>,
    /// Existing rows to delete
    pub stale: Vec<Uuid>,
}

impl SyncPlan {
    /// Compare the parsed feed with the rows this subscription created before.
    ///
    /// A date covered by several events is written once, for the first event.
    /// An existing row is stale when its UID left the feed or its date is no
    /// longer covered by any event.
    pub fn build(sub: &IcalSubscription, events: &[FeedEvent], existing: &[LockedDate]) -> Self {
        let mut covered: HashSet<NaiveDate> = HashSet::new();
        let mut rows = Vec::new();

        for event in events {
            let reason = event
                .summary
                .clone()
                .filter(|summary| !summary.trim().is_empty())
                .unwrap_or_else(|| format!("Blocked by {}", sub.source_name));

            for date in event.dates() {
                if !covered.insert(date) {
                    continue;
                }
                rows.push(NewLockedDate {
                    property_id: sub.property_id,
                    user_id: sub.user_id,
                    date,
                    reason: Some(reason.clone()),
                    source: LockSource::External,
                    source_name: Some(sub.source_name.clone()),
                    external_uid: Some(event.uid.clone()),
                    subscription_id: Some(sub.id),
                });
            }
        }

        let uids: HashSet<&str> = events.iter().map(|e| e.uid.as_str()).collect();
        let stale = existing
            .iter()
            .filter(|row| {
                let uid_present = row
                    .external_uid
                    .as_deref()
                    .is_some_and(|uid| uids.contains(uid));
                !uid_present || !covered.contains(&row.date)
            })
            .map(|row| row.id)
            .collect();

        SyncPlan { rows, stale }
    }
}
