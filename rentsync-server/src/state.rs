use std::sync::Arc;

use rentsync_core::RentSyncResult;
use rentsync_core::config::Settings;
use rentsync_core::lifecycle::SubscriptionLifecycle;
use rentsync_core::publish::FeedPublisher;
use rentsync_core::push::PushGateway;
use rentsync_core::share::SharedCalendar;
use rentsync_core::store::Store;
use rentsync_core::sync::{CalendarSync, FeedClient};

/// Shared application state
///
/// Every engine is stateless apart from its handles to the store and the
/// push gateway, so one instance serves all requests.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<SubscriptionLifecycle>,
    pub sync: Arc<CalendarSync>,
    pub publisher: Arc<FeedPublisher>,
    pub share: Arc<SharedCalendar>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        push: Arc<dyn PushGateway>,
        feed_client: FeedClient,
        batch_size: usize,
    ) -> Self {
        AppState {
            lifecycle: Arc::new(SubscriptionLifecycle::new(store.clone(), push)),
            sync: Arc::new(
                CalendarSync::new(store.clone(), feed_client).with_batch_size(batch_size),
            ),
            publisher: Arc::new(FeedPublisher::new(store.clone())),
            share: Arc::new(SharedCalendar::new(store)),
        }
    }

    /// Wire the PostgREST store and push gateway from settings.
    pub fn from_settings(settings: &Settings) -> RentSyncResult<Self> {
        let store: Arc<dyn Store> = Arc::new(settings.rest_store()?);
        let push: Arc<dyn PushGateway> = Arc::new(settings.push_gateway());
        Ok(AppState::new(
            store,
            push,
            settings.feed_client()?,
            settings.sync.batch_size,
        ))
    }
}
