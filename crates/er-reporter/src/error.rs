use thiserror::Error;

/// Why a delivery attempt (or the whole send) failed.
///
/// These never escape `Reporter::report`; the fire-and-forget surface logs
/// them instead. They are public so the queue worker and the CLI can react
/// to the outcome of an individual send.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Webhook URL is not configured")]
    MissingWebhookUrl,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {status}")]
    Status { status: u16, body: String },
}

impl SendError {
    /// HTTP status of the final response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
