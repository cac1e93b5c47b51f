//! Configuration loader with file and environment variable support

use crate::{ConfigError, ReporterConfig};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "error-reporter.toml",
    "./config/error-reporter.toml",
    "/etc/error-reporter/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<ReporterConfig, ConfigError> {
        let mut config = ReporterConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = ReporterConfig::from_file(&path)?;
        }

        apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        // Check explicit path first
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        // Check ERROR_REPORTER_CONFIG env var
        if let Ok(path) = env::var("ERROR_REPORTER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // Search standard paths
        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `ERROR_REPORTER_*` environment variable overrides
fn apply_env_overrides(config: &mut ReporterConfig) {
    if let Ok(val) = env::var("ERROR_REPORTER_ENABLED") {
        config.enabled = parse_bool(&val).unwrap_or(config.enabled);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_WEBHOOK_URL") {
        config.webhook_url = val;
    }
    if let Ok(val) = env::var("ERROR_REPORTER_REPOSITORY") {
        config.repository = Some(val);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_SECRET") {
        config.secret_key = Some(val);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_ENVIRONMENTS") {
        config.environments = split_list(&val);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_ENVIRONMENT") {
        config.environment = val;
    }
    if let Ok(val) = env::var("ERROR_REPORTER_USE_QUEUE") {
        config.use_queue = parse_bool(&val).unwrap_or(config.use_queue);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_QUEUE") {
        config.queue_name = val;
    }
    if let Ok(val) = env::var("ERROR_REPORTER_RATE_LIMITING_ENABLED") {
        config.rate_limiting.enabled = parse_bool(&val).unwrap_or(config.rate_limiting.enabled);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_CACHE_MINUTES") {
        if let Ok(minutes) = val.parse() {
            config.rate_limiting.cache_minutes = minutes;
        }
    }
    if let Ok(val) = env::var("ERROR_REPORTER_HTTP_TIMEOUT") {
        if let Ok(timeout) = val.parse() {
            config.http.timeout = timeout;
        }
    }
    if let Ok(val) = env::var("ERROR_REPORTER_HTTP_RETRY_TIMES") {
        if let Ok(times) = val.parse() {
            config.http.retry_times = times;
        }
    }
    if let Ok(val) = env::var("ERROR_REPORTER_HTTP_RETRY_DELAY") {
        if let Ok(delay) = val.parse() {
            config.http.retry_delay = delay;
        }
    }
    if let Ok(val) = env::var("ERROR_REPORTER_IGNORE") {
        config.ignore = split_list(&val);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_ADDITIONAL_TAGS") {
        config.additional_tags = split_list(&val);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_INCLUDE_REQUEST_DATA") {
        config.include_request_data = parse_bool(&val).unwrap_or(config.include_request_data);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_SENSITIVE_KEYS") {
        config.sensitive_keys = split_list(&val);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_STACK_TRACE_LINES") {
        if let Ok(lines) = val.parse() {
            config.stack_trace_lines = lines;
        }
    }
    if let Ok(val) = env::var("ERROR_REPORTER_APP_URL") {
        config.app_url = Some(val);
    }
    if let Ok(val) = env::var("ERROR_REPORTER_APP_VERSION") {
        config.app_version = Some(val);
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list("production, staging,,  local "),
            vec!["production", "staging", "local"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn loads_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
webhook_url = "https://hooks.example.com/report"
environments = ["production", "staging"]

[rate_limiting]
cache_minutes = 15

[http]
retry_times = 5
"#
        )
        .unwrap();

        let config = ConfigLoader::with_path(file.path()).load().unwrap();
        assert_eq!(config.webhook_url, "https://hooks.example.com/report");
        assert_eq!(config.environments, vec!["production", "staging"]);
        assert_eq!(config.rate_limiting.cache_minutes, 15);
        assert_eq!(config.http.retry_times, 5);
        // Untouched fields keep defaults.
        assert_eq!(config.http.timeout, 10);
    }

    #[test]
    fn missing_explicit_file_falls_back_to_defaults() {
        let config = ConfigLoader::with_path("/definitely/not/here.toml")
            .load()
            .unwrap();
        assert_eq!(config.webhook_url, "");
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"queue_name = "from-file""#).unwrap();

        // Env access is process-global; use a key no other test touches.
        env::set_var("ERROR_REPORTER_QUEUE", "from-env");
        let config = ConfigLoader::with_path(file.path()).load().unwrap();
        env::remove_var("ERROR_REPORTER_QUEUE");

        assert_eq!(config.queue_name, "from-env");
    }
}
