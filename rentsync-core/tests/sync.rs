//! Integration tests for iCal feed synchronization
//!
//! Feeds are served by wiremock; locked dates live in a `MemoryStore`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use rentsync_core::RentSyncError;
use rentsync_core::model::{LockSource, Property, SyncStatus};
use rentsync_core::store::MemoryStore;
use rentsync_core::sync::{CalendarSync, FeedClient};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    sync: CalendarSync,
    property: Property,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let client = FeedClient::new("RentSync-Test/1.0", Duration::from_secs(5)).unwrap();
    let sync = CalendarSync::new(store.clone(), client);
    let property = property(Uuid::new_v4(), "Beach House");
    store.insert_property(property.clone());
    Harness {
        server,
        store,
        sync,
        property,
    }
}

/// Serve `body` at `route` until the returned guard is dropped.
async fn serve(server: &MockServer, route: &str, body: String) -> wiremock::MockGuard {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount_as_scoped(server)
        .await
}

#[tokio::test]
async fn test_single_event_locks_each_night() {
    let h = harness().await;
    let _feed = serve(&h.server, "/a.ics", feed(&[("abc", "20260101", "20260104")])).await;
    let sub = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    h.store.insert_ical_subscription(sub.clone());

    let run = h.sync.sync_one(sub.id, now()).await.unwrap();

    assert_eq!(run.synced, 1);
    assert_eq!(run.failed, 0);
    let report = &run.results[0];
    assert!(report.success);
    assert_eq!(report.events_found, 1);
    assert_eq!(report.dates_upserted, 3);
    assert_eq!(report.dates_removed, 0);

    let rows = h.store.locked_dates();
    let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2026, 1, 1), date(2026, 1, 2), date(2026, 1, 3)]);
    for row in &rows {
        assert_eq!(row.external_uid.as_deref(), Some("abc"));
        assert_eq!(row.source, LockSource::External);
        assert_eq!(row.source_name.as_deref(), Some("Airbnb"));
        assert_eq!(row.subscription_id, Some(sub.id));
        assert_eq!(row.property_id, h.property.id);
    }

    let recorded = h.store.ical_subscription(sub.id).unwrap();
    assert_eq!(recorded.last_sync_status, Some(SyncStatus::Success));
    assert_eq!(recorded.last_synced_at, Some(now()));
    assert_eq!(recorded.last_error_message, None);
}

#[tokio::test]
async fn test_unchanged_feed_is_idempotent() {
    let h = harness().await;
    let _feed = serve(
        &h.server,
        "/a.ics",
        feed(&[
            ("abc", "20260101", "20260104"),
            ("def", "20260110", "20260112"),
        ]),
    )
    .await;
    let sub = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    h.store.insert_ical_subscription(sub.clone());

    h.sync.sync_one(sub.id, now()).await.unwrap();
    let before: Vec<_> = h
        .store
        .locked_dates()
        .into_iter()
        .map(|r| (r.id, r.date, r.external_uid))
        .collect();

    let run = h.sync.sync_one(sub.id, now()).await.unwrap();
    let after: Vec<_> = h
        .store
        .locked_dates()
        .into_iter()
        .map(|r| (r.id, r.date, r.external_uid))
        .collect();

    assert_eq!(run.results[0].dates_removed, 0);
    assert_eq!(before.len(), 5);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_vanished_event_removes_only_its_dates() {
    let h = harness().await;
    let sub = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    h.store.insert_ical_subscription(sub.clone());
    h.store
        .insert_locked_date(manual_lock(&h.property, date(2026, 1, 20), "Owner stay"));

    {
        let _feed = serve(
            &h.server,
            "/a.ics",
            feed(&[
                ("abc", "20260101", "20260104"),
                ("def", "20260110", "20260112"),
            ]),
        )
        .await;
        h.sync.sync_one(sub.id, now()).await.unwrap();
    }

    let _feed = serve(&h.server, "/a.ics", feed(&[("def", "20260110", "20260112")])).await;
    let run = h.sync.sync_one(sub.id, now()).await.unwrap();

    assert_eq!(run.results[0].dates_removed, 3);
    let remaining: Vec<_> = h
        .store
        .locked_dates()
        .into_iter()
        .map(|r| (r.date, r.external_uid))
        .collect();
    assert_eq!(
        remaining,
        vec![
            (date(2026, 1, 10), Some("def".to_string())),
            (date(2026, 1, 11), Some("def".to_string())),
            (date(2026, 1, 20), None),
        ]
    );
}

#[tokio::test]
async fn test_empty_feed_clears_external_locks() {
    let h = harness().await;
    let sub = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    h.store.insert_ical_subscription(sub.clone());

    {
        let _feed = serve(&h.server, "/a.ics", feed(&[("abc", "20260301", "20260305")])).await;
        h.sync.sync_one(sub.id, now()).await.unwrap();
    }
    assert_eq!(h.store.locked_dates().len(), 4);

    let _feed = serve(&h.server, "/a.ics", feed(&[])).await;
    let run = h.sync.sync_one(sub.id, now()).await.unwrap();

    assert!(run.results[0].success);
    assert_eq!(run.results[0].events_found, 0);
    assert_eq!(run.results[0].dates_removed, 4);
    assert!(h.store.locked_dates().is_empty());
}

#[tokio::test]
async fn test_two_feeds_may_lock_the_same_date() {
    let h = harness().await;
    let _a = serve(&h.server, "/a.ics", feed(&[("abc", "20260401", "20260402")])).await;
    let _b = serve(&h.server, "/b.ics", feed(&[("xyz", "20260401", "20260402")])).await;
    let airbnb = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    let mut booking = ical_subscription(&h.property, format!("{}/b.ics", h.server.uri()));
    booking.source_name = "Booking.com".into();
    h.store.insert_ical_subscription(airbnb);
    h.store.insert_ical_subscription(booking);

    let run = h.sync.sync_all(now()).await.unwrap();

    assert_eq!(run.synced, 2);
    assert_eq!(h.store.locked_dates().len(), 2);
}

#[tokio::test]
async fn test_failing_feed_does_not_block_others() {
    let h = harness().await;
    let _ok = serve(&h.server, "/ok.ics", feed(&[("abc", "20260501", "20260503")])).await;
    Mock::given(method("GET"))
        .and(path("/broken.ics"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    let good = ical_subscription(&h.property, format!("{}/ok.ics", h.server.uri()));
    let bad = ical_subscription(&h.property, format!("{}/broken.ics", h.server.uri()));
    let mut inactive = ical_subscription(&h.property, format!("{}/ok.ics", h.server.uri()));
    inactive.is_active = false;
    h.store.insert_ical_subscription(good.clone());
    h.store.insert_ical_subscription(bad.clone());
    h.store.insert_ical_subscription(inactive.clone());

    let run = h.sync.sync_all(now()).await.unwrap();

    assert_eq!(run.synced, 1);
    assert_eq!(run.failed, 1);
    assert_eq!(run.results.len(), 2);

    let failed = run
        .results
        .iter()
        .find(|r| r.subscription_id == bad.id)
        .unwrap();
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("500"));

    let recorded = h.store.ical_subscription(bad.id).unwrap();
    assert_eq!(recorded.last_sync_status, Some(SyncStatus::Error));
    assert!(recorded.last_error_message.is_some());
    assert_eq!(h.store.ical_subscription(inactive.id).unwrap().last_synced_at, None);
    assert_eq!(h.store.locked_dates().len(), 2);
}

#[tokio::test]
async fn test_bad_row_falls_back_to_row_by_row() {
    let h = harness().await;
    let _feed = serve(&h.server, "/a.ics", feed(&[("abc", "20260601", "20260606")])).await;
    let sub = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    h.store.insert_ical_subscription(sub.clone());
    h.store.reject_locked_date(date(2026, 6, 3));

    let sync = CalendarSync::new(
        h.store.clone(),
        FeedClient::new("RentSync-Test/1.0", Duration::from_secs(5)).unwrap(),
    )
    .with_batch_size(2);
    let run = sync.sync_one(sub.id, now()).await.unwrap();

    let report = &run.results[0];
    assert!(report.success);
    assert_eq!(report.dates_upserted, 4);
    assert_eq!(report.dates_failed, 1);

    let dates: Vec<_> = h.store.locked_dates().iter().map(|r| r.date).collect();
    assert!(!dates.contains(&date(2026, 6, 3)));
    assert_eq!(dates.len(), 4);
}

#[tokio::test]
async fn test_feed_with_no_writable_dates_is_an_error() {
    let h = harness().await;
    let _feed = serve(&h.server, "/a.ics", feed(&[("abc", "20260601", "20260603")])).await;
    let sub = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    h.store.insert_ical_subscription(sub.clone());
    h.store.reject_locked_date(date(2026, 6, 1));
    h.store.reject_locked_date(date(2026, 6, 2));

    let run = h.sync.sync_one(sub.id, now()).await.unwrap();

    assert_eq!(run.synced, 0);
    assert_eq!(run.failed, 1);
    let report = &run.results[0];
    assert!(!report.success);
    assert!(report.error.is_some());
    assert_eq!(report.dates_upserted, 0);
    assert_eq!(report.dates_failed, 2);
    assert!(h.store.locked_dates().is_empty());

    let recorded = h.store.ical_subscription(sub.id).unwrap();
    assert_eq!(recorded.last_sync_status, Some(SyncStatus::Error));
    assert!(recorded.last_error_message.is_some());
}

#[tokio::test]
async fn test_sync_report_json_shape() {
    let h = harness().await;
    let _feed = serve(&h.server, "/a.ics", feed(&[("abc", "20260101", "20260102")])).await;
    let sub = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    h.store.insert_ical_subscription(sub.clone());

    let run = h.sync.sync_one(sub.id, now()).await.unwrap();
    let json = serde_json::to_value(&run).unwrap();

    assert_eq!(json["synced"], 1);
    let result = &json["results"][0];
    assert_eq!(result["subscriptionId"], sub.id.to_string());
    assert_eq!(result["sourceName"], "Airbnb");
    assert_eq!(result["eventsFound"], 1);
    assert_eq!(result["datesUpserted"], 1);
    assert_eq!(result["datesRemoved"], 0);
    assert!(result.get("error").is_none());
}

#[tokio::test]
async fn test_unknown_or_inactive_subscription_is_not_found() {
    let h = harness().await;
    let mut inactive = ical_subscription(&h.property, format!("{}/a.ics", h.server.uri()));
    inactive.is_active = false;
    h.store.insert_ical_subscription(inactive.clone());

    assert!(matches!(
        h.sync.sync_one(Uuid::new_v4(), now()).await,
        Err(RentSyncError::NotFound(_))
    ));
    assert!(matches!(
        h.sync.sync_one(inactive.id, now()).await,
        Err(RentSyncError::NotFound(_))
    ));
}
