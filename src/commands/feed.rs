use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::Utc;
use rentsync_core::publish::FeedPublisher;

use super::Context;

pub async fn run(ctx: &Context, token: &str, output: Option<&Path>) -> Result<()> {
    let feed = FeedPublisher::new(ctx.store.clone())
        .render(Some(token), Utc::now())
        .await?;

    match output {
        Some(path) => {
            std::fs::write(path, &feed.body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} ({})", path.display(), feed.filename);
        }
        None => print!("{}", feed.body),
    }
    Ok(())
}
