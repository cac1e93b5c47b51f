//! Error Report Pipeline
//!
//! This crate provides the report decision-and-delivery pipeline:
//! - fingerprint: stable identity for an error occurrence, used for dedup and tagging
//! - DedupStore: time-bounded cache suppressing repeat reports within a window
//! - EligibilityFilter: enablement, environment, ignore-list and dedup gating
//! - PayloadBuilder: formats an occurrence into a structured webhook report
//! - WebhookSender: HTTP delivery with timeout, bounded retries and failure logging
//! - Reporter: the fire-and-forget entry point, choosing inline or deferred delivery
//!
//! Nothing in this pipeline propagates an error back through `report` - the
//! reporter observes failures without becoming a new source of them.

pub mod dedup;
pub mod eligibility;
pub mod error;
pub mod fingerprint;
pub mod payload;
pub mod reporter;
pub mod sender;

pub use dedup::{DedupStore, InMemoryDedupStore};
pub use eligibility::EligibilityFilter;
pub use error::SendError;
pub use fingerprint::fingerprint;
pub use payload::{PayloadBuilder, MASK};
pub use reporter::Reporter;
pub use sender::{SendSuccess, WebhookDeliveryHandler, WebhookSender, SECRET_HEADER};
