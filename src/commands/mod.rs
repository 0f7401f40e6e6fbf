pub mod feed;
pub mod lifecycle;
pub mod reminders;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use rentsync_core::config::Settings;
use rentsync_core::push::PushGateway;
use rentsync_core::store::Store;
use serde::Serialize;

/// Settings plus the live store and push handles, loaded once per invocation.
pub struct Context {
    pub settings: Settings,
    pub store: Arc<dyn Store>,
    pub push: Arc<dyn PushGateway>,
}

impl Context {
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let settings = Settings::load(config).context("Failed to load configuration")?;
        let store: Arc<dyn Store> = Arc::new(settings.rest_store()?);
        let push: Arc<dyn PushGateway> = Arc::new(settings.push_gateway());
        Ok(Self {
            settings,
            store,
            push,
        })
    }
}

/// Print a job summary as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
