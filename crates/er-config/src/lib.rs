//! Error Reporter Configuration
//!
//! TOML-based configuration with environment variable overrides. Loaded once
//! at process start and treated as read-only for the life of the process;
//! each report snapshots the delivery-relevant slice.

use er_common::DeliverySettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Master switch; nothing is reported when false.
    pub enabled: bool,

    /// Webhook endpoint for reports. Empty means delivery is a logged no-op.
    pub webhook_url: String,

    /// Repository identifier sent with each report. Falls back to the
    /// `app_url` host (dots replaced with dashes) when unset.
    pub repository: Option<String>,

    /// Shared secret sent as the `X-Laravel-Secret` header when set.
    pub secret_key: Option<String>,

    /// Environments in which reporting is active.
    pub environments: Vec<String>,

    /// Name of the environment this process is running in.
    pub environment: String,

    /// Hand delivery to the job queue instead of sending inline.
    pub use_queue: bool,

    /// Queue name for deferred delivery jobs.
    pub queue_name: String,

    pub rate_limiting: RateLimitConfig,

    pub http: HttpConfig,

    /// Exception kind identifiers and categories that are never reported.
    pub ignore: Vec<String>,

    /// Static tags added to every report.
    pub additional_tags: Vec<String>,

    /// Include request URL/method/IP/user/input in the report body.
    pub include_request_data: bool,

    /// Request-data keys whose values are masked before reporting.
    pub sensitive_keys: Vec<String>,

    /// Maximum stack frames rendered into the report body.
    pub stack_trace_lines: usize,

    /// Public URL of the host application, used for repository fallback.
    pub app_url: Option<String>,

    /// Host application version, shown in the report footer.
    pub app_version: Option<String>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: String::new(),
            repository: None,
            secret_key: None,
            environments: vec!["production".to_string()],
            environment: "production".to_string(),
            use_queue: false,
            queue_name: "default".to_string(),
            rate_limiting: RateLimitConfig::default(),
            http: HttpConfig::default(),
            ignore: Vec::new(),
            additional_tags: Vec::new(),
            include_request_data: true,
            sensitive_keys: vec![
                "password".to_string(),
                "password_confirmation".to_string(),
                "credit_card".to_string(),
                "cvv".to_string(),
                "token".to_string(),
                "secret".to_string(),
                "api_key".to_string(),
            ],
            stack_trace_lines: 10,
            app_url: None,
            app_version: None,
        }
    }
}

/// Fingerprint-based rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Suppression window for a repeated fingerprint.
    pub cache_minutes: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_minutes: 5,
        }
    }
}

/// HTTP client configuration for webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-attempt request timeout in seconds.
    pub timeout: u64,
    /// Additional attempts after the first on failure.
    pub retry_times: u32,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: 10,
            retry_times: 3,
            retry_delay: 100,
        }
    }
}

impl ReporterConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ReporterConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Repository identifier for reports.
    ///
    /// Explicit `repository` wins; otherwise derived from the `app_url` host
    /// with dots replaced by dashes; "unknown" as the last resort.
    pub fn repository_name(&self) -> String {
        if let Some(repo) = &self.repository {
            if !repo.is_empty() {
                return repo.clone();
            }
        }
        if let Some(url) = &self.app_url {
            if let Some(host) = host_of(url) {
                return host.replace('.', "-");
            }
        }
        "unknown".to_string()
    }

    /// Snapshot the delivery-relevant settings for a send or a deferred job.
    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            webhook_url: self.webhook_url.clone(),
            secret_key: self.secret_key.clone(),
            timeout: Duration::from_secs(self.http.timeout),
            retry_times: self.http.retry_times,
            retry_delay: Duration::from_millis(self.http.retry_delay),
        }
    }

    /// Dedup record TTL from the rate-limiting window.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.rate_limiting.cache_minutes * 60)
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Error Reporter Configuration
# ERROR_REPORTER_* environment variables override these settings

enabled = true
webhook_url = ""
# repository = "my-org/my-app"
# secret_key = ""
environments = ["production"]
environment = "production"
use_queue = false
queue_name = "default"
ignore = []
additional_tags = []
include_request_data = true
sensitive_keys = [
    "password",
    "password_confirmation",
    "credit_card",
    "cvv",
    "token",
    "secret",
    "api_key",
]
stack_trace_lines = 10
# app_url = "https://example.com"
# app_version = "1.2.3"

[rate_limiting]
enabled = true
cache_minutes = 5

[http]
timeout = 10       # seconds
retry_times = 3
retry_delay = 100  # milliseconds
"#
        .to_string()
    }
}

/// Extract the host portion of a URL without pulling in a URL parser.
fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()?
        .split('@')
        .next_back()?
        .split(':')
        .next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_surface() {
        let config = ReporterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.environments, vec!["production"]);
        assert!(config.rate_limiting.enabled);
        assert_eq!(config.rate_limiting.cache_minutes, 5);
        assert_eq!(config.http.timeout, 10);
        assert_eq!(config.http.retry_times, 3);
        assert_eq!(config.http.retry_delay, 100);
        assert_eq!(config.stack_trace_lines, 10);
        assert!(config.sensitive_keys.contains(&"password".to_string()));
    }

    #[test]
    fn repository_name_prefers_explicit_value() {
        let config = ReporterConfig {
            repository: Some("my-org/my-app".to_string()),
            app_url: Some("https://example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(config.repository_name(), "my-org/my-app");
    }

    #[test]
    fn repository_name_falls_back_to_app_url_host() {
        let config = ReporterConfig {
            app_url: Some("https://status.example.com/health?x=1".to_string()),
            ..Default::default()
        };
        assert_eq!(config.repository_name(), "status-example-com");
    }

    #[test]
    fn repository_name_unknown_without_sources() {
        assert_eq!(ReporterConfig::default().repository_name(), "unknown");
    }

    #[test]
    fn example_toml_parses_back() {
        let config: ReporterConfig = toml::from_str(&ReporterConfig::example_toml()).unwrap();
        assert!(config.enabled);
        assert_eq!(config.queue_name, "default");
    }

    #[test]
    fn delivery_settings_snapshot() {
        let config = ReporterConfig {
            webhook_url: "https://hooks.example.com/report".to_string(),
            secret_key: Some("s3cret".to_string()),
            ..Default::default()
        };
        let settings = config.delivery_settings();
        assert_eq!(settings.webhook_url, "https://hooks.example.com/report");
        assert_eq!(settings.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.retry_times, 3);
        assert_eq!(settings.retry_delay, Duration::from_millis(100));
    }

    #[test]
    fn host_of_handles_edge_shapes() {
        assert_eq!(host_of("https://a.b.c/x"), Some("a.b.c"));
        assert_eq!(host_of("a.b.c"), Some("a.b.c"));
        assert_eq!(host_of("https://user@a.b.c:8080/x"), Some("a.b.c"));
        assert_eq!(host_of(""), None);
    }
}
