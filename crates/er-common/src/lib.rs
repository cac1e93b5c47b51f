use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod logging;

// ============================================================================
// Occurrence Types
// ============================================================================

/// A stable identifier for an exception kind, plus the categories the host
/// application has declared for it.
///
/// The host knows its own exception taxonomy; this core only sees opaque
/// identifiers. Ignore-list matching is a set-membership/prefix test over
/// the kind name and its declared categories, not runtime reflection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExceptionKind {
    /// Fully-qualified kind name, e.g. `app::db::ConnectionLost`.
    pub name: String,
    /// Host-declared categories, e.g. `["transient", "database"]`.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ExceptionKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Last path segment of the kind name.
    ///
    /// Accepts `::`, `\` and `.` as separators so identifiers ported from
    /// other runtimes short-form correctly.
    pub fn short_name(&self) -> &str {
        self.name
            .rsplit(|c| c == ':' || c == '\\' || c == '.')
            .find(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }

    /// Whether this kind matches an ignore-list identifier.
    ///
    /// True when the identifier equals the kind name, equals a declared
    /// category, or is a path prefix of the name (`app::auth` matches
    /// `app::auth::TokenExpired`).
    pub fn matches(&self, ident: &str) -> bool {
        if self.name == ident {
            return true;
        }
        if self.categories.iter().any(|c| c == ident) {
            return true;
        }
        if let Some(rest) = self.name.strip_prefix(ident) {
            return rest.starts_with("::") || rest.starts_with('\\') || rest.starts_with('.');
        }
        false
    }
}

/// A single stack frame captured by the host at the point of failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    /// Enclosing type name, when the frame is inside a method.
    #[serde(default)]
    pub type_name: Option<String>,
    /// Call operator between type and function (`::` when absent).
    #[serde(default)]
    pub call_operator: Option<String>,
    pub function: String,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            type_name: None,
            call_operator: None,
            function: function.into(),
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// Request context attached to an occurrence observed while serving a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub url: Option<String>,
    pub method: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Authenticated user identifier; `None` renders as "Guest".
    pub user: Option<String>,
    /// Raw request input, masked per config before it reaches the payload.
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

/// An immutable capture of one runtime error.
///
/// Created by the host at the moment an error is observed and handed to the
/// pipeline; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub kind: ExceptionKind,
    pub message: String,
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub frames: Vec<StackFrame>,
    /// Present only when the error happened while serving a request.
    #[serde(default)]
    pub request: Option<RequestContext>,
    /// Caller-supplied context passed alongside the error.
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl Occurrence {
    pub fn new(
        kind: ExceptionKind,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            file: file.into(),
            line,
            frames: Vec::new(),
            request: None,
            context: BTreeMap::new(),
        }
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_context(mut self, context: BTreeMap<String, serde_json::Value>) -> Self {
        self.context = context;
        self
    }

    /// File basename, for the report title.
    pub fn file_basename(&self) -> &str {
        self.file
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.file)
    }
}

// ============================================================================
// Delivery Types
// ============================================================================

/// The structured report ready for transmission.
///
/// Wire format matches the webhook contract:
/// `{"repository", "issueTitle", "issueTags", "issueMessage"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub repository: String,
    pub issue_title: String,
    pub issue_tags: Vec<String>,
    pub issue_message: String,
}

impl ReportPayload {
    /// The `hash-` fingerprint tag, when present. Used for delivery logging.
    pub fn fingerprint_tag(&self) -> Option<&str> {
        self.issue_tags
            .iter()
            .find(|t| t.starts_with("hash-"))
            .map(|t| t.as_str())
    }
}

/// The delivery-relevant slice of configuration, snapshotted per report so a
/// deferred job is unaffected by later reconfiguration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySettings {
    pub webhook_url: String,
    pub secret_key: Option<String>,
    /// Whole-request timeout per attempt.
    pub timeout: Duration,
    /// Additional attempts after the first on transport failure or non-2xx.
    pub retry_times: u32,
    /// Fixed delay between HTTP-level attempts.
    pub retry_delay: Duration,
}

/// A deferred unit of delivery work: payload plus everything needed to send
/// it later, possibly from another worker.
///
/// Carries its own queue-level retry policy, independent of the HTTP-level
/// retries inside the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub payload: ReportPayload,
    pub settings: DeliverySettings,
    pub queue_name: String,
    /// Total delivery attempts before the job is declared failed.
    pub max_attempts: u32,
    /// Waits between queue-level attempts; the last entry repeats if the
    /// schedule is shorter than `max_attempts - 1`.
    pub backoff: Vec<Duration>,
}

impl DeliveryJob {
    pub fn new(payload: ReportPayload, settings: DeliverySettings, queue_name: String) -> Self {
        Self {
            payload,
            settings,
            queue_name,
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(10),
                Duration::from_secs(30),
                Duration::from_secs(60),
            ],
        }
    }

    /// Wait before the next attempt, given how many attempts have failed.
    pub fn backoff_after(&self, failed_attempts: u32) -> Duration {
        let idx = (failed_attempts.max(1) - 1) as usize;
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::from_secs(10))
    }
}
