//! Eligibility filtering: which occurrences are worth reporting.

use crate::dedup::DedupStore;
use crate::fingerprint::fingerprint;
use er_common::Occurrence;
use er_config::ReporterConfig;
use std::sync::Arc;
use tracing::debug;

/// Decides whether an occurrence should be reported at all.
///
/// Checks run in order and short-circuit on the first rejection: global
/// enable flag, environment allowlist, ignore list, then fingerprint dedup.
/// The dedup record write is the only side effect and happens only when
/// every prior check passed. Rejections are silent by design - an ignored
/// or duplicate error is not a failure of the pipeline.
pub struct EligibilityFilter {
    config: Arc<ReporterConfig>,
    store: Arc<dyn DedupStore>,
}

impl EligibilityFilter {
    pub fn new(config: Arc<ReporterConfig>, store: Arc<dyn DedupStore>) -> Self {
        Self { config, store }
    }

    pub fn should_report(&self, occurrence: &Occurrence) -> bool {
        if !self.config.enabled {
            return false;
        }

        if !self
            .config
            .environments
            .iter()
            .any(|e| e == &self.config.environment)
        {
            debug!(
                environment = %self.config.environment,
                "Reporting inactive in this environment"
            );
            return false;
        }

        if self
            .config
            .ignore
            .iter()
            .any(|ident| occurrence.kind.matches(ident))
        {
            debug!(kind = %occurrence.kind.name, "Exception kind is on the ignore list");
            return false;
        }

        if self.config.rate_limiting.enabled {
            let tag = fingerprint(&occurrence.kind.name, &occurrence.file, occurrence.line);
            if self.store.has(&tag) {
                debug!(hash = %tag, "Duplicate occurrence within rate-limit window");
                return false;
            }
            self.store.put(&tag, self.config.cache_ttl());
        }

        true
    }
}
