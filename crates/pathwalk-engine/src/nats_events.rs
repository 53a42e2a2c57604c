//! NATS publisher for walk events.
//!
//! The engine's notifier is synchronous and must never block a pass, so
//! events travel through a bounded channel (see
//! [`ChannelNotifier`](pathwalk_core::ChannelNotifier)) to a forwarding task
//! that owns the NATS client.
//!
//! # Subject Convention
//!
//! `{prefix}.{walker_id}.{kind}`, e.g. `pathwalk.walkers.42.arrived`.
//! Payloads are the JSON form of [`WalkEvent`].

use pathwalk_types::WalkEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Subject an event is published on.
pub fn event_subject(prefix: &str, event: &WalkEvent) -> String {
    format!("{prefix}.{}.{}", event.walker_id(), event.kind().as_str())
}

/// Publishes walk events to NATS.
pub struct NatsEventPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsEventPublisher {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the connection fails.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, EngineError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| EngineError::Nats {
                message: format!("failed to connect to NATS at {url}: {e}"),
            })?;
        Ok(Self {
            client,
            prefix: prefix.to_owned(),
        })
    }

    /// Publish one event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if serialization or the publish fails.
    pub async fn publish(&self, event: &WalkEvent) -> Result<(), EngineError> {
        let subject = event_subject(&self.prefix, event);
        let payload = serde_json::to_vec(event).map_err(|e| EngineError::Nats {
            message: format!("failed to serialize walk event: {e}"),
        })?;
        debug!(subject = subject, "publishing walk event");
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| EngineError::Nats {
                message: format!("failed to publish to {subject}: {e}"),
            })
    }

    /// Forward events from `events` until every sender is dropped, then
    /// flush. Resolves to the number of events published.
    pub fn spawn(self, mut events: mpsc::Receiver<WalkEvent>) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut published: u64 = 0;
            while let Some(event) = events.recv().await {
                match self.publish(&event).await {
                    Ok(()) => published = published.saturating_add(1),
                    Err(e) => warn!(error = %e, "walk event dropped"),
                }
            }
            if let Err(e) = self.client.flush().await {
                warn!(error = %e, "failed to flush NATS client");
            }
            info!(published, "walk event publisher stopped");
            published
        })
    }
}
