use anyhow::Result;
use chrono::Utc;
use rentsync_core::sync::CalendarSync;
use uuid::Uuid;

use super::{Context, print_json};

pub async fn run(ctx: &Context, subscription: Option<Uuid>) -> Result<()> {
    let sync = CalendarSync::new(ctx.store.clone(), ctx.settings.feed_client()?)
        .with_batch_size(ctx.settings.sync.batch_size);

    let now = Utc::now();
    let run = match subscription {
        Some(id) => sync.sync_one(id, now).await?,
        None => sync.sync_all(now).await?,
    };

    for report in run.results.iter().filter(|r| !r.success) {
        tracing::warn!(
            subscription_id = %report.subscription_id,
            source = %report.source_name,
            error = report.error.as_deref().unwrap_or_default(),
            "feed sync failed"
        );
    }

    print_json(&run)?;
    if run.failed > 0 {
        anyhow::bail!("{} of {} feeds failed to sync", run.failed, run.results.len());
    }
    Ok(())
}
