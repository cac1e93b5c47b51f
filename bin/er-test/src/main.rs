//! Error reporter test command.
//!
//! Verifies configuration and webhook connectivity:
//! - default: lightweight connectivity probe POST with a static test payload
//! - `--dry-run`: build and print a payload without sending anything
//! - `--real`: send a real test report through the full pipeline
//!
//! Exit code 0 on success, 1 when the reporter is disabled or the webhook
//! URL is missing.

use anyhow::Result;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use er_common::{ExceptionKind, Occurrence, StackFrame};
use er_config::{ConfigLoader, ReporterConfig};
use er_reporter::{fingerprint, InMemoryDedupStore, Reporter, WebhookSender};

#[derive(Parser)]
#[command(name = "er-test", about = "Test the error reporter configuration and webhook")]
struct Cli {
    /// Config file path (otherwise standard search paths and env vars)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Build and print a payload without sending
    #[arg(long, conflicts_with = "real")]
    dry_run: bool,

    /// Send a real test exception through the full pipeline
    #[arg(long)]
    real: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    er_common::logging::init_logging("er-test");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::with_path(path).load()?,
        None => ConfigLoader::new().load()?,
    };

    println!("Testing Error Reporter Configuration...");
    println!();
    print_summary(&config);
    println!();

    if !config.enabled {
        eprintln!("Error Reporter is disabled. Set ERROR_REPORTER_ENABLED=true");
        std::process::exit(1);
    }
    if config.webhook_url.is_empty() {
        eprintln!("Webhook URL is not configured. Set ERROR_REPORTER_WEBHOOK_URL");
        std::process::exit(1);
    }

    let config = Arc::new(config);

    if cli.dry_run {
        dry_run(&config)?;
    } else if cli.real {
        send_real_test(&config).await;
    } else {
        probe_webhook(&config).await;
    }

    Ok(())
}

fn print_summary(config: &ReporterConfig) {
    let row = |name: &str, value: String| println!("  {name:<22} {value}");
    row("Enabled", check(config.enabled));
    row(
        "Webhook URL",
        if config.webhook_url.is_empty() {
            "not configured".to_string()
        } else {
            config.webhook_url.clone()
        },
    );
    row("Repository", config.repository_name());
    row("Secret Key", check(config.secret_key.is_some()));
    row("Use Queue", check(config.use_queue));
    row("Rate Limiting", check(config.rate_limiting.enabled));
    row("Environment", config.environment.clone());
    row("Active Environments", config.environments.join(", "));
}

fn check(on: bool) -> String {
    if on {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// Build the payload a test occurrence would produce and print it.
fn dry_run(config: &Arc<ReporterConfig>) -> Result<()> {
    println!("Generating test payload...");
    let reporter = Reporter::new(config.clone());
    let payload = reporter.build_payload(&test_occurrence());
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// POST a static probe payload directly through the sender.
async fn probe_webhook(config: &Arc<ReporterConfig>) {
    println!("Testing webhook connection...");

    let stamp = chrono::Utc::now().timestamp().to_string();
    let probe_tag = format!("hash-test{}", &fingerprint(&stamp, "probe", 0)[5..9]);

    let payload = er_common::ReportPayload {
        repository: config.repository_name(),
        issue_title: "Test Error: Connection test from er-test".to_string(),
        issue_tags: vec![
            "test".to_string(),
            "error-reporter".to_string(),
            probe_tag,
        ],
        issue_message: format!(
            "**Test Error**\n\nThis is a test message from the error reporter.\n\n\
             **Time:** {} UTC\n**Environment:** {}\n\n\
             *This is a test message and can be safely ignored.*",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
            config.environment,
        ),
    };

    let sender = WebhookSender::new();
    match sender.try_send(&payload, &config.delivery_settings()).await {
        Ok(success) => {
            println!("Webhook test successful!");
            println!("Response: {}", success.body);
        }
        Err(e) => {
            println!("Webhook test failed: {e}");
            if let Some(status) = e.status() {
                println!("HTTP status: {status}");
            }
        }
    }
}

/// Run a synthetic occurrence through the complete pipeline, including the
/// in-process queue when `use_queue` is set.
async fn send_real_test(config: &Arc<ReporterConfig>) {
    println!("Sending real test exception to webhook...");

    let (reporter, queue) =
        Reporter::with_in_process_queue(config.clone(), Arc::new(InMemoryDedupStore::new()));
    reporter.report(test_occurrence()).await;

    // Deferred delivery happens on queue workers; wait for them before exit.
    while queue.in_flight() > 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    println!("Test exception sent to webhook!");
    println!("Check your webhook endpoint for the error report.");
}

fn test_occurrence() -> Occurrence {
    let mut context = BTreeMap::new();
    context.insert("source".to_string(), serde_json::json!("er-test"));
    context.insert("test".to_string(), serde_json::json!(true));

    Occurrence::new(
        ExceptionKind::new("er_test::TestError"),
        "This is a test exception from the er-test command",
        file!(),
        line!(),
    )
    .with_frames(vec![
        StackFrame::new(file!(), line!(), "send_real_test"),
        StackFrame::new(file!(), line!(), "main"),
    ])
    .with_context(context)
}
