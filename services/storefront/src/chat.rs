//! Shopping assistant passthrough
//!
//! The assistant itself is hosted elsewhere; this endpoint only shapes the
//! traffic (rate limiting happens in middleware) and relays the conversation.

use axum::http::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::error;

use crate::config::ChatConfig;
use crate::error::{ApiError, ApiResult};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Relays chat requests to the configured assistant upstream
#[derive(Clone)]
pub struct ChatProxy {
    http: reqwest::Client,
    upstream_url: Option<String>,
}

impl ChatProxy {
    pub fn new(config: &ChatConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;

        Ok(Self {
            http,
            upstream_url: config.upstream_url.clone().filter(|url| !url.is_empty()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.upstream_url.is_some()
    }

    /// Forward a conversation and return the upstream status and body
    pub async fn forward(&self, conversation: &Value) -> ApiResult<(StatusCode, Value)> {
        let has_messages = conversation
            .get("messages")
            .and_then(Value::as_array)
            .is_some_and(|messages| !messages.is_empty());
        if !has_messages {
            return Err(ApiError::BadRequest(
                "At least one message is required".to_string(),
            ));
        }

        let Some(url) = &self.upstream_url else {
            return Err(ApiError::ServiceUnavailable(
                "Shopping assistant is not configured".to_string(),
            ));
        };

        let response = self
            .http
            .post(url)
            .json(conversation)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach shopping assistant: {}", e);
                ApiError::Upstream(e.to_string())
            })?;

        let status = response.status();
        let body = response.json::<Value>().await.map_err(|e| {
            error!("Shopping assistant returned an unreadable body: {}", e);
            ApiError::Upstream(e.to_string())
        })?;

        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_empty_conversation_is_rejected() {
        let proxy = ChatProxy::new(&ChatConfig::default()).unwrap();

        let result = proxy.forward(&json!({ "messages": [] })).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_disabled_without_upstream() {
        let proxy = ChatProxy::new(&ChatConfig::default()).unwrap();
        assert!(!proxy.is_enabled());

        let result = proxy
            .forward(&json!({ "messages": [{ "role": "user", "content": "whey?" }] }))
            .await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_forwards_to_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assistant"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "reply": "Try our whey isolate" })),
            )
            .mount(&server)
            .await;
        let proxy = ChatProxy::new(&ChatConfig {
            upstream_url: Some(format!("{}/assistant", server.uri())),
            timeout_secs: Some(5),
        })
        .unwrap();

        let (status, body) = proxy
            .forward(&json!({ "messages": [{ "role": "user", "content": "protein?" }] }))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Try our whey isolate");
    }
}
