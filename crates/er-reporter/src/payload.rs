//! Payload building: formats an eligible occurrence into a webhook report.

use crate::fingerprint::fingerprint;
use er_common::{Occurrence, ReportPayload, RequestContext};
use er_config::ReporterConfig;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

/// Replacement value for sensitive request-data fields.
pub const MASK: &str = "***MASKED***";

/// Maximum message length in the issue title. The full message always
/// appears untruncated in the body.
const TITLE_MESSAGE_LIMIT: usize = 80;

/// Builds [`ReportPayload`]s from occurrences.
///
/// Pure given the occurrence and the configuration snapshot: no I/O, no
/// clock reads except the report timestamp in the footer. Missing optional
/// data never fails the build - placeholders are substituted instead.
pub struct PayloadBuilder {
    config: Arc<ReporterConfig>,
}

impl PayloadBuilder {
    pub fn new(config: Arc<ReporterConfig>) -> Self {
        Self { config }
    }

    pub fn build(&self, occurrence: &Occurrence) -> ReportPayload {
        ReportPayload {
            repository: self.config.repository_name(),
            issue_title: self.title(occurrence),
            issue_tags: self.tags(occurrence),
            issue_message: self.body(occurrence),
        }
    }

    /// `"{Kind}: {message, truncated} ({basename} line {n})"`
    fn title(&self, occurrence: &Occurrence) -> String {
        format!(
            "{}: {} ({} line {})",
            occurrence.kind.short_name(),
            limit(&occurrence.message, TITLE_MESSAGE_LIMIT),
            occurrence.file_basename(),
            occurrence.line
        )
    }

    /// Base tags plus configured additional tags, deduplicated in
    /// first-seen order.
    fn tags(&self, occurrence: &Occurrence) -> Vec<String> {
        let mut tags: Vec<String> = vec![
            "bug".to_string(),
            "error".to_string(),
            fingerprint(&occurrence.kind.name, &occurrence.file, occurrence.line),
            occurrence.kind.short_name().to_lowercase(),
        ];
        for tag in &self.config.additional_tags {
            tags.push(tag.clone());
        }
        let mut unique = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        unique
    }

    fn body(&self, occurrence: &Occurrence) -> String {
        let mut body = String::new();

        let _ = write!(
            body,
            "**Error:** {}\n\n**File:** {}\n**Line:** {}\n\n**Stack Trace:**\n```\n{}\n```\n\n",
            occurrence.message,
            occurrence.file,
            occurrence.line,
            self.stack_trace(occurrence),
        );

        if self.config.include_request_data {
            body.push_str(&self.request_section(occurrence.request.as_ref()));
        }

        if !occurrence.context.is_empty() {
            let _ = write!(
                body,
                "\n\n**Context:**\n```json\n{}\n```",
                pretty_json(&occurrence.context)
            );
        }

        let _ = write!(
            body,
            "\n\n**Environment:** {}\n**Rust Version:** {}\n**App Version:** {}\n**Time:** {} UTC",
            self.config.environment,
            rust_version(),
            self.config.app_version.as_deref().unwrap_or("unknown"),
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        );

        body
    }

    /// Up to `stack_trace_lines` frames as `#{i} {file}({line}): {type}{op}{fn}()`.
    fn stack_trace(&self, occurrence: &Occurrence) -> String {
        occurrence
            .frames
            .iter()
            .take(self.config.stack_trace_lines)
            .enumerate()
            .map(|(index, frame)| {
                let (type_name, operator) = match &frame.type_name {
                    Some(t) => (t.as_str(), frame.call_operator.as_deref().unwrap_or("::")),
                    None => ("", ""),
                };
                format!(
                    "#{} {}({}): {}{}{}()",
                    index, frame.file, frame.line, type_name, operator, frame.function
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Request block, or a console marker when the occurrence did not happen
    /// while serving a request.
    fn request_section(&self, request: Option<&RequestContext>) -> String {
        let Some(request) = request else {
            return "**Running in Console**\n".to_string();
        };

        let data = self.masked(&request.data);
        let rendered_data = if data.is_empty() {
            "N/A".to_string()
        } else {
            pretty_json(&data)
        };

        format!(
            "**URL:** {}\n**Method:** {}\n**IP:** {}\n**User Agent:** {}\n**User:** {}\n**Request Data:**\n```json\n{}\n```\n",
            request.url.as_deref().unwrap_or("N/A"),
            request.method.as_deref().unwrap_or("N/A"),
            request.client_ip.as_deref().unwrap_or("N/A"),
            request.user_agent.as_deref().unwrap_or("N/A"),
            request.user.as_deref().unwrap_or("Guest"),
            rendered_data,
        )
    }

    /// Copy of the request data with every configured sensitive key's value
    /// replaced. Exact, case-sensitive key match.
    fn masked(
        &self,
        data: &BTreeMap<String, serde_json::Value>,
    ) -> BTreeMap<String, serde_json::Value> {
        let mut masked = data.clone();
        for key in &self.config.sensitive_keys {
            if let Some(value) = masked.get_mut(key) {
                *value = serde_json::Value::String(MASK.to_string());
            }
        }
        masked
    }
}

/// Truncate to `limit` characters with a trailing ellipsis, respecting char
/// boundaries. Messages at or under the limit pass through unchanged.
fn limit(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        return message.to_string();
    }
    let truncated: String = message.chars().take(limit).collect();
    format!("{truncated}...")
}

fn pretty_json(data: &BTreeMap<String, serde_json::Value>) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "N/A".to_string())
}

/// Compiler version captured by the build script (`rustc --version`).
fn rust_version() -> &'static str {
    match option_env!("ER_RUSTC_VERSION") {
        Some(v) if !v.is_empty() => v,
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use er_common::{ExceptionKind, StackFrame};

    fn builder(config: ReporterConfig) -> PayloadBuilder {
        PayloadBuilder::new(Arc::new(config))
    }

    fn occurrence() -> Occurrence {
        Occurrence::new(
            ExceptionKind::new("app::NullPointerAccess"),
            "x is null",
            "/app/Foo.php",
            42,
        )
    }

    #[test]
    fn title_format() {
        let payload = builder(ReporterConfig::default()).build(&occurrence());
        assert_eq!(
            payload.issue_title,
            "NullPointerAccess: x is null (Foo.php line 42)"
        );
    }

    #[test]
    fn title_truncates_long_message_but_body_keeps_it() {
        let long = "e".repeat(120);
        let occ = Occurrence::new(ExceptionKind::new("E"), long.clone(), "f.rs", 1);
        let payload = builder(ReporterConfig::default()).build(&occ);
        assert!(payload.issue_title.contains(&format!("{}...", "e".repeat(80))));
        assert!(!payload.issue_title.contains(&long));
        assert!(payload.issue_message.contains(&long));
    }

    #[test]
    fn title_limit_is_char_safe() {
        let long = "é".repeat(100);
        let occ = Occurrence::new(ExceptionKind::new("E"), long, "f.rs", 1);
        let payload = builder(ReporterConfig::default()).build(&occ);
        assert!(payload.issue_title.contains("..."));
    }

    #[test]
    fn tags_contain_base_set_and_fingerprint() {
        let payload = builder(ReporterConfig::default()).build(&occurrence());
        assert!(payload.issue_tags.contains(&"bug".to_string()));
        assert!(payload.issue_tags.contains(&"error".to_string()));
        assert!(payload.issue_tags.contains(&"nullpointeraccess".to_string()));
        let hash = payload.fingerprint_tag().expect("fingerprint tag");
        assert_eq!(hash.len(), "hash-".len() + 8);
    }

    #[test]
    fn additional_tags_appended_and_deduplicated() {
        let config = ReporterConfig {
            additional_tags: vec!["backend".to_string(), "bug".to_string()],
            ..Default::default()
        };
        let payload = builder(config).build(&occurrence());
        assert!(payload.issue_tags.contains(&"backend".to_string()));
        assert_eq!(
            payload.issue_tags.iter().filter(|t| *t == "bug").count(),
            1
        );
    }

    #[test]
    fn stack_trace_renders_frames_and_respects_limit() {
        let frames = (0..15)
            .map(|i| StackFrame::new(format!("/app/src/m{i}.rs"), i, format!("fn{i}")))
            .collect();
        let occ = occurrence().with_frames(frames);
        let config = ReporterConfig {
            stack_trace_lines: 10,
            ..Default::default()
        };
        let payload = builder(config).build(&occ);
        assert!(payload.issue_message.contains("#0 /app/src/m0.rs(0): fn0()"));
        assert!(payload.issue_message.contains("#9 /app/src/m9.rs(9): fn9()"));
        assert!(!payload.issue_message.contains("#10 "));
    }

    #[test]
    fn frame_with_enclosing_type_uses_call_operator() {
        let frame = StackFrame::new("/app/src/db.rs", 7, "connect").with_type("Pool");
        let occ = occurrence().with_frames(vec![frame]);
        let payload = builder(ReporterConfig::default()).build(&occ);
        assert!(payload.issue_message.contains("#0 /app/src/db.rs(7): Pool::connect()"));
    }

    #[test]
    fn sensitive_keys_masked_in_request_data() {
        let mut request = RequestContext::default();
        request.data.insert(
            "password".to_string(),
            serde_json::Value::String("abc123".to_string()),
        );
        request.data.insert(
            "email".to_string(),
            serde_json::Value::String("a@b.com".to_string()),
        );
        let occ = occurrence().with_request(request);
        let payload = builder(ReporterConfig::default()).build(&occ);

        assert!(payload.issue_message.contains(&format!("\"password\": \"{MASK}\"")));
        assert!(payload.issue_message.contains("a@b.com"));
        assert!(!payload.issue_message.contains("abc123"));
        assert!(!payload.issue_title.contains("abc123"));
    }

    #[test]
    fn masking_is_case_sensitive_exact_match() {
        let mut request = RequestContext::default();
        request.data.insert(
            "Password".to_string(),
            serde_json::Value::String("abc123".to_string()),
        );
        let occ = occurrence().with_request(request);
        let payload = builder(ReporterConfig::default()).build(&occ);
        // "Password" is not on the default sensitive list; only "password" is.
        assert!(payload.issue_message.contains("abc123"));
    }

    #[test]
    fn console_occurrence_gets_console_marker() {
        let payload = builder(ReporterConfig::default()).build(&occurrence());
        assert!(payload.issue_message.contains("**Running in Console**"));
        assert!(!payload.issue_message.contains("**URL:**"));
    }

    #[test]
    fn request_fields_fall_back_to_placeholders() {
        let occ = occurrence().with_request(RequestContext::default());
        let payload = builder(ReporterConfig::default()).build(&occ);
        assert!(payload.issue_message.contains("**URL:** N/A"));
        assert!(payload.issue_message.contains("**User:** Guest"));
        assert!(payload.issue_message.contains("**Request Data:**\n```json\nN/A\n```"));
    }

    #[test]
    fn include_request_data_disabled_omits_section() {
        let mut request = RequestContext::default();
        request.url = Some("https://example.com/checkout".to_string());
        let occ = occurrence().with_request(request);
        let config = ReporterConfig {
            include_request_data: false,
            ..Default::default()
        };
        let payload = builder(config).build(&occ);
        assert!(!payload.issue_message.contains("**URL:**"));
        assert!(!payload.issue_message.contains("**Running in Console**"));
    }

    #[test]
    fn context_rendered_when_present() {
        let mut context = BTreeMap::new();
        context.insert("order_id".to_string(), serde_json::json!(1234));
        let occ = occurrence().with_context(context);
        let payload = builder(ReporterConfig::default()).build(&occ);
        assert!(payload.issue_message.contains("**Context:**"));
        assert!(payload.issue_message.contains("\"order_id\": 1234"));
    }

    #[test]
    fn empty_context_omitted() {
        let payload = builder(ReporterConfig::default()).build(&occurrence());
        assert!(!payload.issue_message.contains("**Context:**"));
    }

    #[test]
    fn footer_has_environment_and_timestamp() {
        let config = ReporterConfig {
            environment: "production".to_string(),
            app_version: Some("2.4.1".to_string()),
            ..Default::default()
        };
        let payload = builder(config).build(&occurrence());
        assert!(payload.issue_message.contains("**Environment:** production"));
        assert!(payload.issue_message.contains("**App Version:** 2.4.1"));
        assert!(payload.issue_message.contains("UTC"));
    }

    #[test]
    fn footer_reports_the_actual_compiler_version() {
        let payload = builder(ReporterConfig::default()).build(&occurrence());
        // The build script records `rustc --version` output, e.g.
        // "rustc 1.80.0 (051478957 2024-07-21)".
        assert!(payload.issue_message.contains("**Rust Version:** rustc "));
    }

    #[test]
    fn repository_from_config() {
        let config = ReporterConfig {
            repository: Some("acme/shop".to_string()),
            ..Default::default()
        };
        let payload = builder(config).build(&occurrence());
        assert_eq!(payload.repository, "acme/shop");
    }
}
