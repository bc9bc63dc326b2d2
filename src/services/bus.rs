//! HTTP client of the message bus API

use crate::config::BusConfig;
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::events::{BusEvent, EventPublisher};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SERVICE: &str = "bus";

/// Tokens are renewed this long before the provider says they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Posts events to the bus API with a machine-to-machine token
///
/// The token is obtained with a client-credentials grant and reused until
/// shortly before it expires.
pub struct BusClient {
    http: reqwest::Client,
    config: BusConfig,
    token: Mutex<Option<CachedToken>>,
}

impl BusClient {
    pub fn new(config: BusConfig) -> Self {
        Self::with_http_client(reqwest::Client::new(), config)
    }

    pub fn with_http_client(http: reqwest::Client, config: BusConfig) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    /// Current machine token, fetched on first use and after expiry
    async fn access_token(&self) -> ServiceResult<String> {
        // Lock held across the fetch: one token request at a time
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        tracing::debug!(auth_url = %self.config.auth_url, "requesting machine token");
        let response = self
            .http
            .post(&self.config.auth_url)
            .json(&serde_json::json!({
                "grant_type": "client_credentials",
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "audience": self.config.audience,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::external(
                SERVICE,
                format!("token request failed with {}: {}", status, body),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ServiceError::external(SERVICE, format!("failed to parse token response: {}", e))
        })?;

        let fresh = CachedToken {
            access_token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(TOKEN_EXPIRY_MARGIN)),
        };
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    /// Post an event to the configured error topic
    pub async fn post_error_event(&self, payload: serde_json::Value) -> ServiceResult<()> {
        let event = BusEvent::new(&self.config.error_topic, &self.config.originator, payload);
        self.post_event(event).await
    }

    fn events_url(&self) -> String {
        format!("{}/bus/events", self.config.bus_api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EventPublisher for BusClient {
    async fn post_event(&self, event: BusEvent) -> ServiceResult<()> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(token)
            .json(&event)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::external(
                SERVICE,
                format!("posting to {} failed with {}: {}", event.topic, status, body),
            ));
        }

        tracing::info!(topic = %event.topic, "event posted to bus");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_url_trims_trailing_slash() {
        let client = BusClient::new(BusConfig {
            bus_api_url: "http://bus.local/v5/".to_string(),
            ..Default::default()
        });
        assert_eq!(client.events_url(), "http://bus.local/v5/bus/events");
    }

    #[test]
    fn test_token_freshness() {
        let expired = CachedToken {
            access_token: "t".into(),
            expires_at: Some(Instant::now() - Duration::from_secs(1)),
        };
        assert!(!expired.is_fresh());

        let unbounded = CachedToken {
            access_token: "t".into(),
            expires_at: None,
        };
        assert!(unbounded.is_fresh());
    }
}
