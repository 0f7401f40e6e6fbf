//! Push gateway that records instead of delivering

use std::sync::Mutex;

use async_trait::async_trait;
use rentsync_core::RentSyncError;
use rentsync_core::RentSyncResult;
use rentsync_core::push::{PushGateway, PushMessage};

#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<PushMessage>>,
    batches: Mutex<usize>,
    failing: Mutex<bool>,
}

#[allow(dead_code)]
impl RecordingPush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every batch from now on (after recording it).
    pub fn fail_deliveries(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn batches(&self) -> usize {
        *self.batches.lock().unwrap()
    }
}

#[async_trait]
impl PushGateway for RecordingPush {
    async fn send(&self, messages: &[PushMessage]) -> RentSyncResult<()> {
        self.sent.lock().unwrap().extend_from_slice(messages);
        *self.batches.lock().unwrap() += 1;
        if *self.failing.lock().unwrap() {
            return Err(RentSyncError::Push("gateway down".into()));
        }
        Ok(())
    }
}
