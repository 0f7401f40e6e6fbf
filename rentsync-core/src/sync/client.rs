use std::time::Duration;

use reqwest::header::ACCEPT;

use crate::error::{RentSyncError, RentSyncResult};

/// HTTP client for external `.ics` feeds.
#[derive(Clone)]
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(user_agent: &str, timeout: Duration) -> RentSyncResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| RentSyncError::Config(format!("could not build feed client: {e}")))?;
        Ok(FeedClient { client })
    }

    /// GET the feed body. Any non-2xx status is a failure.
    pub async fn fetch(&self, feed_url: &str) -> RentSyncResult<String> {
        let url = normalize_feed_url(feed_url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/calendar, text/plain;q=0.9, */*;q=0.1")
            .send()
            .await
            .map_err(|e| RentSyncError::FeedFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RentSyncError::FeedFetch(format!(
                "feed returned HTTP {status}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| RentSyncError::FeedFetch(e.to_string()))
    }
}

/// Calendar apps hand out `webcal://` links for what is plain HTTPS.
fn normalize_feed_url(feed_url: &str) -> String {
    let trimmed = feed_url.trim();
    match trimmed.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => trimmed.to_string(),
    }
}
