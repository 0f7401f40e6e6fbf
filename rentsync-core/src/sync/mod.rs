//! External iCal feed synchronization into `locked_dates`.
//!
//! Each active subscription is fetched, parsed and reconciled on its own:
//! rows are keyed by the originating event UID and the feed is treated as
//! authoritative. One subscription failing never stops the others.

mod client;
mod plan;

pub use client::FeedClient;
pub use plan::SyncPlan;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constants::UPSERT_BATCH_SIZE;
use crate::error::{RentSyncError, RentSyncResult};
use crate::ics::parse_feed;
use crate::model::{IcalSubscription, NewLockedDate, SyncOutcome};
use crate::store::Store;

/// Outcome of syncing one subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub subscription_id: Uuid,
    pub source_name: String,
    pub property_id: Uuid,
    pub success: bool,
    pub events_found: usize,
    pub dates_upserted: usize,
    pub dates_removed: usize,
    /// Dates that could not be written even one row at a time
    pub dates_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    fn new(sub: &IcalSubscription) -> Self {
        SyncReport {
            subscription_id: sub.id,
            source_name: sub.source_name.clone(),
            property_id: sub.property_id,
            success: false,
            events_found: 0,
            dates_upserted: 0,
            dates_removed: 0,
            dates_failed: 0,
            error: None,
        }
    }
}

/// Aggregate over every subscription in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncRun {
    pub synced: usize,
    pub failed: usize,
    pub results: Vec<SyncReport>,
}

impl SyncRun {
    fn push(&mut self, report: SyncReport) {
        if report.success {
            self.synced += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(report);
    }
}

pub struct CalendarSync {
    store: Arc<dyn Store>,
    client: FeedClient,
    batch_size: usize,
}

impl CalendarSync {
    pub fn new(store: Arc<dyn Store>, client: FeedClient) -> Self {
        CalendarSync {
            store,
            client,
            batch_size: UPSERT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sync a single subscription by id.
    pub async fn sync_one(&self, id: Uuid, now: DateTime<Utc>) -> RentSyncResult<SyncRun> {
        let sub = self
            .store
            .find_ical_subscription(id)
            .await?
            .filter(|sub| sub.is_active)
            .ok_or_else(|| {
                RentSyncError::NotFound(format!("iCal subscription {id} not found or inactive"))
            })?;

        let mut run = SyncRun::default();
        run.push(self.sync_subscription(&sub, now).await);
        Ok(run)
    }

    /// Sync every active subscription.
    pub async fn sync_all(&self, now: DateTime<Utc>) -> RentSyncResult<SyncRun> {
        let subs = self.store.active_ical_subscriptions().await?;

        let mut run = SyncRun::default();
        for sub in &subs {
            run.push(self.sync_subscription(sub, now).await);
        }

        tracing::info!(
            synced = run.synced,
            failed = run.failed,
            "calendar sync run complete"
        );
        Ok(run)
    }

    /// Sync one subscription and record its outcome; never fails.
    pub async fn sync_subscription(
        &self,
        sub: &IcalSubscription,
        now: DateTime<Utc>,
    ) -> SyncReport {
        let mut report = SyncReport::new(sub);

        let outcome = match self.reconcile(sub, &mut report).await {
            Ok(()) => {
                report.success = true;
                tracing::info!(
                    subscription_id = %sub.id,
                    source = %sub.source_name,
                    events = report.events_found,
                    upserted = report.dates_upserted,
                    removed = report.dates_removed,
                    failed = report.dates_failed,
                    "synced calendar feed"
                );
                SyncOutcome::success(now)
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = %sub.id,
                    source = %sub.source_name,
                    error = %e,
                    "calendar feed sync failed"
                );
                report.error = Some(e.to_string());
                SyncOutcome::failure(now, e.to_string())
            }
        };

        if let Err(e) = self.store.record_sync_outcome(sub.id, &outcome).await {
            tracing::warn!(subscription_id = %sub.id, error = %e, "failed to record sync outcome");
        }

        report
    }

    async fn reconcile(
        &self,
        sub: &IcalSubscription,
        report: &mut SyncReport,
    ) -> RentSyncResult<()> {
        let body = self.client.fetch(&sub.feed_url).await?;
        let events = parse_feed(&body)?;
        report.events_found = events.len();

        let existing = self.store.external_locked_dates(sub.id).await?;
        let plan = SyncPlan::build(sub, &events, &existing);

        if !plan.stale.is_empty() {
            self.store.delete_locked_dates(&plan.stale).await?;
        }
        report.dates_removed = plan.stale.len();

        let (upserted, failed) = self.upsert(&plan.rows).await;
        report.dates_upserted = upserted;
        report.dates_failed = failed;

        if upserted == 0 && failed > 0 {
            return Err(RentSyncError::Store(format!(
                "none of {failed} locked dates could be written"
            )));
        }
        Ok(())
    }

    /// Upsert in batches, retrying a failed batch one row at a time.
    ///
    /// Returns `(upserted, failed)`.
    async fn upsert(&self, rows: &[NewLockedDate]) -> (usize, usize) {
        let mut upserted = 0;
        let mut failed = 0;

        for batch in rows.chunks(self.batch_size) {
            match self.store.upsert_locked_dates(batch).await {
                Ok(()) => upserted += batch.len(),
                Err(e) => {
                    tracing::warn!(
                        rows = batch.len(),
                        error = %e,
                        "batch upsert failed, retrying row by row"
                    );
                    for row in batch {
                        match self.store.upsert_locked_dates(std::slice::from_ref(row)).await {
                            Ok(()) => upserted += 1,
                            Err(e) => {
                                failed += 1;
                                tracing::warn!(
                                    date = %row.date,
                                    error = %e,
                                    "dropping locked date"
                                );
                            }
                        }
                    }
                }
            }
        }

        (upserted, failed)
    }
}
