use anyhow::Result;
use chrono::Utc;
use rentsync_core::lifecycle::SubscriptionLifecycle;

use super::{Context, print_json};

pub async fn run(ctx: &Context) -> Result<()> {
    let lifecycle = SubscriptionLifecycle::new(ctx.store.clone(), ctx.push.clone());
    let summary = lifecycle.advance(Utc::now()).await?;

    tracing::info!(
        moved_to_grace = summary.moved_to_grace,
        moved_to_expired = summary.moved_to_expired,
        "lifecycle run finished"
    );
    print_json(&summary)
}
