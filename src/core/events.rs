//! Bus events emitted by member mutations
//!
//! Mutations publish a [`BusEvent`] through an [`EventPublisher`]. In
//! production the publisher is the HTTP bus client
//! (`crate::services::bus::BusClient`); [`LocalEventBus`] delivers the same
//! events in-process through a `tokio::sync::broadcast` channel, which is what
//! tests and embedded deployments subscribe to.
//!
//! ```text
//! MemberService ──▶ EventPublisher::post_event() ──▶ BusClient ──▶ bus API
//!                                                 └▶ LocalEventBus ──▶ subscribers
//! ```

use crate::core::error::ServiceResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const JSON_MIME_TYPE: &str = "application/json";

/// A message posted to the event bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusEvent {
    pub topic: String,
    pub originator: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "mime-type")]
    pub mime_type: String,
    pub payload: serde_json::Value,
}

impl BusEvent {
    /// Create a JSON event stamped with the current time
    pub fn new(topic: &str, originator: &str, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.to_string(),
            originator: originator.to_string(),
            timestamp: Utc::now(),
            mime_type: JSON_MIME_TYPE.to_string(),
            payload,
        }
    }
}

/// Destination of bus events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Post one event; a failure is returned to the caller, never retried
    async fn post_event(&self, event: BusEvent) -> ServiceResult<()>;
}

/// Broadcast-based in-process event bus
///
/// The bus is cheap to clone and can be shared across threads. Events
/// published while nobody subscribes are dropped.
#[derive(Debug, Clone)]
pub struct LocalEventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl LocalEventBus {
    /// Create a bus buffering up to `capacity` events per lagging receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event, returning the number of receivers reached
    pub fn publish(&self, event: BusEvent) -> usize {
        // send() only fails when there are no receivers
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventPublisher for LocalEventBus {
    async fn post_event(&self, event: BusEvent) -> ServiceResult<()> {
        let receivers = self.publish(event);
        tracing::debug!(receivers, "bus event published locally");
        Ok(())
    }
}
