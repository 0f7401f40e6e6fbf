use anyhow::Result;
use chrono::Utc;
use rentsync_core::lifecycle::SubscriptionLifecycle;

use super::{Context, print_json};

pub async fn run(ctx: &Context) -> Result<()> {
    let lifecycle = SubscriptionLifecycle::new(ctx.store.clone(), ctx.push.clone());
    let summary = lifecycle.send_reminders(Utc::now()).await?;

    tracing::info!(sent = summary.total_reminders_sent, "reminder run finished");
    print_json(&summary)
}
