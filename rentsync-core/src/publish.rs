//! Outbound availability feed for one property.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::constants::UID_DOMAIN;
use crate::error::{RentSyncError, RentSyncResult};
use crate::ics::{FeedEventOut, render_calendar};
use crate::model::{AccessToken, LockedDate, Reservation};
use crate::store::Store;

const RESERVED_SUMMARY: &str = "Reserved";
const BLOCKED_SUMMARY: &str = "Blocked";

/// A rendered `.ics` document
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedFeed {
    pub filename: String,
    pub body: String,
}

pub struct FeedPublisher {
    store: Arc<dyn Store>,
}

/// Token from a `/{token}.ics` path segment.
pub fn token_from_filename(filename: &str) -> Option<&str> {
    filename
        .strip_suffix(".ics")
        .filter(|stem| !stem.is_empty())
}

impl FeedPublisher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        FeedPublisher { store }
    }

    /// Render the feed behind a feed token. Read-only.
    pub async fn render(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> RentSyncResult<PublishedFeed> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RentSyncError::InvalidRequest("Missing feed token".into()))?;

        let access = AccessToken::check(self.store.find_feed_token(token).await?, now)?;
        let property_id = access.property_id;

        let (property, reservations, locks) = tokio::try_join!(
            self.store.find_property(property_id),
            self.store.reservations_for_property(property_id),
            self.store.manual_locked_dates(property_id),
        )?;
        let property =
            property.ok_or_else(|| RentSyncError::NotFound("Property not found".into()))?;

        let mut events: Vec<FeedEventOut> = reservations
            .iter()
            .filter(|r| r.status.blocks_dates() && r.check_out > r.check_in)
            .map(reservation_event)
            .collect();
        events.extend(group_locks(property_id, locks));
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.uid.cmp(&b.uid)));

        tracing::debug!(property_id = %property_id, events = events.len(), "rendered feed");

        Ok(PublishedFeed {
            filename: format!("{property_id}.ics"),
            body: render_calendar(&property.name, &events),
        })
    }
}

fn reservation_event(reservation: &Reservation) -> FeedEventOut {
    FeedEventOut {
        uid: format!("reservation-{}@{UID_DOMAIN}", reservation.id),
        start: reservation.check_in,
        end: reservation.check_out,
        summary: RESERVED_SUMMARY.to_string(),
        description: None,
    }
}

/// A run of consecutive days sharing one reason; `end` is exclusive.
struct LockRun {
    start: NaiveDate,
    end: NaiveDate,
    reason: Option<String>,
}

impl LockRun {
    fn into_event(self, property_id: Uuid) -> FeedEventOut {
        FeedEventOut {
            uid: format!(
                "block-{property_id}-{}-{}@{UID_DOMAIN}",
                self.start.format("%Y%m%d"),
                self.end.format("%Y%m%d")
            ),
            start: self.start,
            end: self.end,
            summary: self
                .reason
                .filter(|reason| !reason.trim().is_empty())
                .unwrap_or_else(|| BLOCKED_SUMMARY.to_string()),
            description: None,
        }
    }
}

/// Merge manual locks into runs. A gap or a different reason starts a new run.
fn group_locks(property_id: Uuid, mut locks: Vec<LockedDate>) -> Vec<FeedEventOut> {
    locks.sort_by(|a, b| a.date.cmp(&b.date));

    let mut runs: Vec<LockRun> = Vec::new();
    for lock in locks {
        if let Some(run) = runs.last_mut().filter(|run| run.reason == lock.reason) {
            if lock.date < run.end {
                // duplicate row for a day already in the run
                continue;
            }
            if lock.date == run.end {
                run.end = lock.date + Duration::days(1);
                continue;
            }
        }
        runs.push(LockRun {
            start: lock.date,
            end: lock.date + Duration::days(1),
            reason: lock.reason,
        });
    }

    runs.into_iter()
        .map(|run| run.into_event(property_id))
        .collect()
}
