//! Telemetry Pipeline
//!
//! Bounded queue between the request path and the store. `submit` never
//! waits: a full queue drops the event. The worker caps concurrent writes
//! with a semaphore and, once every sender is gone, finishes what is queued
//! and in flight before it exits.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

use crate::application::config::TelemetryConfig;
use crate::application::record_usage::RecordUsageUseCase;
use crate::domain::entities::RequestLogEntry;
use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
use crate::error::{TelemetryError, TelemetryResult};
use crate::metrics::EVENTS_DROPPED_TOTAL;

/// Sending side, cloned into the middleware
#[derive(Debug, Clone)]
pub struct TelemetryPipeline {
    sender: mpsc::Sender<RequestLogEntry>,
}

/// Worker task handle
#[derive(Debug)]
pub struct PipelineHandle {
    worker: JoinHandle<()>,
}

impl TelemetryPipeline {
    /// Start the worker on the current runtime
    pub fn spawn<S>(store: S, config: &TelemetryConfig) -> (Self, PipelineHandle)
    where
        S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
    {
        let config = config.clone().normalized();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let use_case = Arc::new(RecordUsageUseCase::new(Arc::new(store)));

        let worker = tokio::spawn(run_worker(receiver, use_case, config.max_in_flight));

        tracing::info!(
            queue_capacity = config.queue_capacity,
            max_in_flight = config.max_in_flight,
            "Telemetry pipeline started"
        );

        (Self { sender }, PipelineHandle { worker })
    }

    /// Queue an event without waiting
    pub fn submit(&self, entry: RequestLogEntry) -> TelemetryResult<()> {
        match self.sender.try_send(entry) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(entry)) => {
                EVENTS_DROPPED_TOTAL.inc();
                tracing::warn!(
                    request_id = %entry.request_id,
                    endpoint = %entry.endpoint,
                    "Telemetry queue full, dropping usage event"
                );
                Err(TelemetryError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                EVENTS_DROPPED_TOTAL.inc();
                tracing::warn!(
                    request_id = %entry.request_id,
                    "Telemetry pipeline closed, dropping usage event"
                );
                Err(TelemetryError::QueueClosed)
            }
        }
    }

    /// Free slots in the queue
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

impl PipelineHandle {
    /// Wait for the worker to drain, at most `timeout`
    ///
    /// Returns once every `TelemetryPipeline` clone has been dropped and all
    /// queued events are written.
    pub async fn drain(self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.worker).await {
            Ok(Ok(())) => {
                tracing::info!("Telemetry pipeline drained");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Telemetry worker failed");
                false
            }
            Err(_) => {
                tracing::warn!(?timeout, "Telemetry pipeline did not drain in time");
                false
            }
        }
    }
}

async fn run_worker<S>(
    mut receiver: mpsc::Receiver<RequestLogEntry>,
    use_case: Arc<RecordUsageUseCase<S>>,
    max_in_flight: usize,
) where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let permits = Arc::new(Semaphore::new(max_in_flight));

    while let Some(entry) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let use_case = use_case.clone();
        tokio::spawn(async move {
            use_case.execute(&entry).await;
            drop(permit);
        });
    }

    // All permits back means no write is still running
    let total = u32::try_from(max_in_flight).unwrap_or(u32::MAX);
    let _ = permits.acquire_many(total).await;
}
