//! Reporter facade: the fire-and-forget entry point.

use crate::dedup::{DedupStore, InMemoryDedupStore};
use crate::eligibility::EligibilityFilter;
use crate::payload::PayloadBuilder;
use crate::sender::{WebhookDeliveryHandler, WebhookSender};
use er_common::{DeliveryJob, Occurrence, ReportPayload};
use er_config::ReporterConfig;
use er_queue::{InProcessQueue, JobSink};
use std::sync::Arc;
use tracing::{error, warn};

/// The pipeline entry point the host hands occurrences to.
///
/// `report` never raises back to the caller: ineligible occurrences return
/// silently, and every delivery failure terminates in a log record. The
/// dedup store and job sink are injected so deployments can substitute a
/// shared cache or an external broker.
pub struct Reporter {
    config: Arc<ReporterConfig>,
    filter: EligibilityFilter,
    builder: PayloadBuilder,
    sender: Arc<WebhookSender>,
    queue: Option<Arc<dyn JobSink>>,
}

impl Reporter {
    /// Reporter with an in-memory dedup store and no job sink.
    pub fn new(config: Arc<ReporterConfig>) -> Self {
        Self::with_store(config, Arc::new(InMemoryDedupStore::new()))
    }

    pub fn with_store(config: Arc<ReporterConfig>, store: Arc<dyn DedupStore>) -> Self {
        Self {
            filter: EligibilityFilter::new(config.clone(), store),
            builder: PayloadBuilder::new(config.clone()),
            sender: Arc::new(WebhookSender::new()),
            queue: None,
            config,
        }
    }

    /// Attach a job sink for deferred delivery. Only consulted when
    /// `use_queue` is enabled.
    pub fn with_queue(mut self, queue: Arc<dyn JobSink>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Reporter wired to an [`InProcessQueue`] that delivers through this
    /// reporter's sender. Returns the queue handle so callers can drain it
    /// before shutdown.
    pub fn with_in_process_queue(
        config: Arc<ReporterConfig>,
        store: Arc<dyn DedupStore>,
    ) -> (Self, Arc<InProcessQueue>) {
        let reporter = Self::with_store(config, store);
        let handler = Arc::new(WebhookDeliveryHandler::new(reporter.sender.clone()));
        let queue = Arc::new(InProcessQueue::new(handler));
        (reporter.with_queue(queue.clone()), queue)
    }

    /// Report one occurrence. Fire-and-forget: filtering, building and
    /// delivery failures all stay inside the pipeline.
    pub async fn report(&self, occurrence: Occurrence) {
        if !self.filter.should_report(&occurrence) {
            return;
        }
        let payload = self.builder.build(&occurrence);
        self.dispatch(payload).await;
    }

    /// Report with extra caller-supplied context merged into the
    /// occurrence, matching the `report(occurrence, context)` surface hosts
    /// usually call from an error hook.
    pub async fn report_with_context(
        &self,
        mut occurrence: Occurrence,
        context: std::collections::BTreeMap<String, serde_json::Value>,
    ) {
        occurrence.context.extend(context);
        self.report(occurrence).await;
    }

    /// Build the payload an occurrence would produce, without any
    /// eligibility check or delivery. Used by the CLI dry-run.
    pub fn build_payload(&self, occurrence: &Occurrence) -> ReportPayload {
        self.builder.build(occurrence)
    }

    pub fn sender(&self) -> Arc<WebhookSender> {
        self.sender.clone()
    }

    async fn dispatch(&self, payload: ReportPayload) {
        let settings = self.config.delivery_settings();

        if self.config.use_queue {
            if let Some(queue) = &self.queue {
                let job =
                    DeliveryJob::new(payload, settings, self.config.queue_name.clone());
                if let Err(e) = queue.submit(job) {
                    error!(error = %e, "Failed to enqueue error report");
                }
                return;
            }
            warn!("use_queue is enabled but no job sink is configured, sending inline");
        }

        self.sender.send(&payload, &settings).await;
    }
}
