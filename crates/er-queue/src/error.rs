use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

/// Error returned by a delivery handler for a single attempt.
///
/// Deliberately stringly-typed: the queue does not care why an attempt
/// failed, only whether to retry.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
