//! Deferred delivery for error reports.
//!
//! The reporter core does not assume any particular scheduler: it emits a
//! serializable [`DeliveryJob`] and hands it to a [`JobSink`]. This crate
//! provides the in-process implementation, which runs each job on a tokio
//! task with the job's own retry schedule and a terminal-failure hook.
//! Multi-process deployments can implement [`JobSink`] against an external
//! broker instead; the job is plain serde data.

use async_trait::async_trait;
use er_common::DeliveryJob;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub mod error;

pub use error::{HandlerError, QueueError};

pub type Result<T> = std::result::Result<T, QueueError>;

/// Accepts delivery jobs for eventual execution.
pub trait JobSink: Send + Sync {
    /// Hand over a job. Returns once the job is accepted, not delivered.
    fn submit(&self, job: DeliveryJob) -> Result<()>;
}

/// Executes one delivery attempt for a job.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn deliver(&self, job: &DeliveryJob) -> std::result::Result<(), HandlerError>;
}

/// Called when a job has exhausted all attempts. Receives the job and the
/// last attempt's error.
pub type FailureHook = Arc<dyn Fn(&DeliveryJob, &HandlerError) + Send + Sync>;

/// In-process queue: one tokio task per job.
///
/// Failures in a worker never reach the thread that reported the original
/// error; by the time a job runs, that caller has already returned.
pub struct InProcessQueue {
    handler: Arc<dyn DeliveryHandler>,
    failure_hook: FailureHook,
    in_flight: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl InProcessQueue {
    pub fn new(handler: Arc<dyn DeliveryHandler>) -> Self {
        Self::with_failure_hook(handler, Arc::new(log_exhausted_job))
    }

    pub fn with_failure_hook(handler: Arc<dyn DeliveryHandler>, failure_hook: FailureHook) -> Self {
        Self {
            handler,
            failure_hook,
            in_flight: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    /// Jobs accepted but not yet finished (delivered or exhausted).
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop accepting new jobs. Jobs already submitted keep running.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    async fn run_job(
        handler: Arc<dyn DeliveryHandler>,
        failure_hook: FailureHook,
        job: DeliveryJob,
    ) {
        let max_attempts = job.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match handler.deliver(&job).await {
                Ok(()) => {
                    debug!(
                        queue = %job.queue_name,
                        attempt = attempt,
                        title = %job.payload.issue_title,
                        "Deferred report delivered"
                    );
                    return;
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        failure_hook(&job, &e);
                        return;
                    }
                    let delay = job.backoff_after(attempt);
                    warn!(
                        queue = %job.queue_name,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Deferred delivery failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl JobSink for InProcessQueue {
    fn submit(&self, job: DeliveryJob) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| QueueError::NoRuntime(e.to_string()))?;

        let handler = self.handler.clone();
        let failure_hook = self.failure_hook.clone();
        let in_flight = self.in_flight.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);
        handle.spawn(async move {
            Self::run_job(handler, failure_hook, job).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(())
    }
}

/// Default terminal-failure hook: log the full payload so the report can be
/// recovered manually.
fn log_exhausted_job(job: &DeliveryJob, last_error: &HandlerError) {
    let payload = serde_json::to_string(&job.payload)
        .unwrap_or_else(|_| "<unserializable payload>".to_string());
    error!(
        queue = %job.queue_name,
        attempts = job.max_attempts,
        error = %last_error,
        payload = %payload,
        "Failed to send error report to webhook"
    );
}
