//! Analytics bus client
//!
//! Fire-and-forget emission through a bounded outbox drained by one
//! forwarder task. Overflow drops the event with a warning: losing an
//! observability record is acceptable, blocking a user-facing operation is
//! not. Ordering at the sink is therefore best-effort.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::AnalyticsConfig;
use crate::models::{ArtifactEvent, MistTrigger};

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundEvent {
    Trigger(Box<MistTrigger>),
    Artifact(Box<ArtifactEvent>),
}

/// Handle services emit through; cheap to clone
#[derive(Clone)]
pub struct AnalyticsSink {
    tx: mpsc::Sender<OutboundEvent>,
    depth: Arc<AtomicUsize>,
    dropped: Arc<AtomicU64>,
}

impl AnalyticsSink {
    /// Build the sink and spawn its forwarder task
    pub fn spawn(config: &AnalyticsConfig) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.buffer_size.max(1));
        let depth = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicU64::new(0));

        let sink = Self {
            tx,
            depth: depth.clone(),
            dropped: dropped.clone(),
        };
        let forwarder = tokio::spawn(Self::forward(rx, depth, config.endpoint.clone()));
        (sink, forwarder)
    }

    /// Sink whose queue the caller drains directly instead of a forwarder
    /// task; lets a harness observe exactly what was emitted
    pub fn buffered(capacity: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            tx,
            depth: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// Sink wired to nothing; events are counted and discarded. Used by
    /// tests and deployments without an analytics bus.
    pub fn disabled() -> Self {
        let (tx, mut rx) = mpsc::channel(64);
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        Self {
            tx,
            depth: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue an analytics-bus trigger; drops on overflow
    pub fn emit_trigger(&self, trigger: MistTrigger) {
        self.enqueue(OutboundEvent::Trigger(Box::new(trigger)));
    }

    /// Enqueue a service-plane artifact event; drops on overflow
    pub fn emit_artifact_event(&self, event: ArtifactEvent) {
        self.enqueue(OutboundEvent::Artifact(Box::new(event)));
    }

    pub fn outbox_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn enqueue(&self, event: OutboundEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.depth.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("analytics outbox full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("analytics forwarder gone, dropping event");
            }
        }
    }

    async fn forward(
        mut rx: mpsc::Receiver<OutboundEvent>,
        depth: Arc<AtomicUsize>,
        endpoint: Option<String>,
    ) {
        let client = reqwest::Client::new();
        while let Some(event) = rx.recv().await {
            depth.fetch_sub(1, Ordering::Relaxed);
            let Some(endpoint) = endpoint.as_deref() else {
                debug!("analytics endpoint not configured, discarding event");
                continue;
            };
            let path = match &event {
                OutboundEvent::Trigger(_) => "triggers",
                OutboundEvent::Artifact(_) => "artifact-events",
            };
            let url = format!("{}/{}", endpoint.trim_end_matches('/'), path);
            if let Err(e) = client.post(&url).json(&event).send().await {
                // best-effort plane: log and move on
                warn!(error = %e, "analytics emit failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactType, ClipLifecycleData, ClipLifecycleStage, TriggerPayload};

    fn sample_trigger() -> MistTrigger {
        MistTrigger {
            trigger_type: "clip_lifecycle".to_string(),
            stream_id: None,
            tenant_id: "T1".to_string(),
            payload: TriggerPayload::ClipLifecycle(ClipLifecycleData {
                clip_hash: "0123456789abcdef0123456789abcdef".to_string(),
                stage: ClipLifecycleStage::Requested,
                internal_name: "live+foo".to_string(),
                request_id: "req-1".to_string(),
                size_bytes: None,
                retention_until: None,
                error_message: None,
            }),
        }
    }

    #[tokio::test]
    async fn overflow_drops_instead_of_blocking() {
        let config = AnalyticsConfig {
            endpoint: None,
            buffer_size: 2,
        };
        // build without spawning the forwarder so the queue cannot drain
        let (tx, _rx) = mpsc::channel(config.buffer_size);
        let sink = AnalyticsSink {
            tx,
            depth: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        };

        for _ in 0..5 {
            sink.emit_trigger(sample_trigger());
        }
        assert_eq!(sink.outbox_depth(), 2);
        assert_eq!(sink.dropped_events(), 3);
    }

    #[tokio::test]
    async fn disabled_sink_swallows_events() {
        let sink = AnalyticsSink::disabled();
        sink.emit_artifact_event(ArtifactEvent {
            artifact_type: ArtifactType::Clip,
            artifact_id: "0123456789abcdef0123456789abcdef".to_string(),
            status: "requested".to_string(),
            started_at: None,
            completed_at: None,
            expires_at: None,
        });
        assert_eq!(sink.dropped_events(), 0);
    }
}
