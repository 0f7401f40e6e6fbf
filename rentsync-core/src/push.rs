//! Push notification delivery.

use async_trait::async_trait;
use serde::Serialize;

use crate::constants::PUSH_TOKEN_PREFIXES;
use crate::error::{RentSyncError, RentSyncResult};

/// A single outbound notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub sound: String,
    pub channel_id: String,
}

impl PushMessage {
    pub fn new(
        to: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        PushMessage {
            to: to.into(),
            title: title.into(),
            body: body.into(),
            data,
            sound: "default".to_string(),
            channel_id: "subscription".to_string(),
        }
    }
}

/// Whether a stored token has the push provider's shape.
///
/// Anything else (web tokens, placeholders) is skipped, not an error.
pub fn is_valid_push_token(token: &str) -> bool {
    PUSH_TOKEN_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// Best-effort batch delivery. Success means the gateway accepted the batch.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, messages: &[PushMessage]) -> RentSyncResult<()>;
}

/// Gateway speaking the Expo push HTTP API.
#[derive(Clone)]
pub struct ExpoPushGateway {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl ExpoPushGateway {
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Self {
        ExpoPushGateway {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            access_token,
        }
    }
}

#[async_trait]
impl PushGateway for ExpoPushGateway {
    async fn send(&self, messages: &[PushMessage]) -> RentSyncResult<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(messages);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RentSyncError::Push(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RentSyncError::Push(format!(
                "gateway returned HTTP {}",
                response.status()
            )));
        }

        tracing::debug!(count = messages.len(), "push batch accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_push_token_shape() {
        assert!(is_valid_push_token("ExponentPushToken[xxxxxxxx]"));
        assert!(is_valid_push_token("ExpoPushToken[yyyy]"));
        assert!(!is_valid_push_token(""));
        assert!(!is_valid_push_token("fcm:abcdef"));
    }

    #[tokio::test]
    async fn test_expo_gateway_posts_camel_case_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/send"))
            .and(body_partial_json(serde_json::json!([
                { "to": "ExponentPushToken[a]", "channelId": "subscription", "sound": "default" }
            ])))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = ExpoPushGateway::new(format!("{}/push/send", server.uri()), None);
        let message = PushMessage::new("ExponentPushToken[a]", "t", "b", serde_json::json!({}));

        gateway.send(&[message]).await.unwrap();
    }

    #[tokio::test]
    async fn test_expo_gateway_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway = ExpoPushGateway::new(server.uri(), None);
        let message = PushMessage::new("ExponentPushToken[a]", "t", "b", serde_json::json!({}));

        assert!(matches!(
            gateway.send(&[message]).await,
            Err(RentSyncError::Push(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_sent() {
        let gateway = ExpoPushGateway::new("http://127.0.0.1:9/unreachable", None);
        assert!(gateway.send(&[]).await.is_ok());
    }
}
