//! Async façade over `TriageEngine`.
//!
//! Each request runs on the tokio blocking pool, bounded by a worker
//! semaphore and a per-request timeout. On timeout the service tries to
//! cancel through the request's `CommitGate`. If the cancel wins, the
//! caller gets `ServiceError::Timeout` and the request leaves no trace in
//! the cache or the counters. If the worker already claimed the commit,
//! the service waits for it and returns its response.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::engine::{CommitGate, EngineError, HealthStatus, TriageEngine};
use crate::models::{Query, TriageResponse};
use crate::stats::StatsSnapshot;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request exceeded {0:?} and was discarded")]
    Timeout(Duration),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Service is shutting down")]
    Closed,
}

#[derive(Clone)]
pub struct TriageService {
    engine: Arc<TriageEngine>,
    workers: Arc<Semaphore>,
    timeout: Duration,
}

impl TriageService {
    /// One worker per available core; timeout from the engine config.
    pub fn new(engine: Arc<TriageEngine>) -> Self {
        let workers = std::thread::available_parallelism().map_or(4, |n| n.get());
        let timeout = engine.response_timeout();
        Self::with_limits(engine, workers, timeout)
    }

    pub fn with_limits(engine: Arc<TriageEngine>, workers: usize, timeout: Duration) -> Self {
        Self {
            engine,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
        }
    }

    pub fn engine(&self) -> &Arc<TriageEngine> {
        &self.engine
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn handle_text(&self, text: &str) -> Result<TriageResponse, ServiceError> {
        self.handle(Query::new(text)).await
    }

    pub async fn handle(&self, query: Query) -> Result<TriageResponse, ServiceError> {
        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| ServiceError::Closed)?;

        let queued_ms = (Utc::now() - query.received_at).num_milliseconds();
        let gate = Arc::new(CommitGate::new());
        let worker_gate = Arc::clone(&gate);
        let engine = Arc::clone(&self.engine);

        let mut task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.handle_guarded(&query.text, &worker_gate)
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => Ok(joined??),
            Err(_) => {
                if !gate.cancel() {
                    // the worker is already committing
                    tracing::debug!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Timeout lost to a commit in progress, waiting for it"
                    );
                    return Ok(task.await??);
                }
                self.engine.note_discarded();
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    queued_ms,
                    "Triage request timed out, discarding result"
                );
                Err(ServiceError::Timeout(self.timeout))
            }
        }
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    pub async fn health(&self) -> HealthStatus {
        self.engine.health()
    }

    /// Stop admitting requests. In-flight requests finish normally.
    pub fn close(&self) {
        self.workers.close();
    }
}
