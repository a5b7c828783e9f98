//! # Structured Logging Module
//!
//! Console output for operators plus one JSON log file per orchestrator process
//! under `log/`, so job and task transitions can be replayed after the fact.
//!
//! The level follows the deployment environment (`SEN2AGRI_ENV`, then `APP_ENV`):
//! `info` in production, `debug` everywhere else.

use chrono::Utc;
use std::path::Path;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

const LOG_DIR: &str = "log";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = environment_from(
            std::env::var("SEN2AGRI_ENV").ok(),
            std::env::var("APP_ENV").ok(),
        );
        let level = level_for(&environment);
        let log_dir = Path::new(LOG_DIR);

        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Unable to create log directory {}: {e}", log_dir.display());
            let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(level)).try_init();
            return;
        }

        let file_name = format!(
            "sen2agri-orchestrator.{environment}.{}.{}.log",
            process::id(),
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let (json_writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &file_name));

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(EnvFilter::new(level));
        let json_file = fmt::layer()
            .json()
            .with_writer(json_writer)
            .with_ansi(false)
            .with_filter(EnvFilter::new(level));

        if tracing_subscriber::registry().with(console).with(json_file).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already installed, keeping it");
        }

        tracing::info!(
            environment = %environment,
            log_file = %log_dir.join(&file_name).display(),
            "🔧 Structured logging initialized"
        );

        // flushes on drop; must live for the whole process
        std::mem::forget(guard);
    });
}

fn environment_from(sen2agri_env: Option<String>, app_env: Option<String>) -> String {
    sen2agri_env
        .or(app_env)
        .map(|name| name.to_lowercase())
        .unwrap_or_else(|| "development".to_string())
}

fn level_for(environment: &str) -> &'static str {
    if environment == "production" {
        "info"
    } else {
        "debug"
    }
}

/// Job lifecycle record: submission, finalisation, failure
pub fn log_job_operation(
    operation: &str,
    job_id: i64,
    processor: Option<&str>,
    site_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation,
        job_id,
        processor,
        site_id,
        status,
        details,
        "📋 Job {operation}: {status}"
    );
}

pub fn log_task_operation(
    operation: &str,
    job_id: i64,
    task_id: Option<i64>,
    module: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation,
        job_id,
        task_id,
        module,
        status,
        details,
        "🔧 Task {operation}: {status}"
    );
}

/// Failure record for errors that are swallowed after logging
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(component, operation, error, context, "❌ {component} {operation} failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_precedence() {
        assert_eq!(environment_from(Some("Production".into()), Some("test".into())), "production");
        assert_eq!(environment_from(None, Some("test".into())), "test");
        assert_eq!(environment_from(None, None), "development");
    }

    #[test]
    fn test_level_per_environment() {
        assert_eq!(level_for("production"), "info");
        assert_eq!(level_for("test"), "debug");
        assert_eq!(level_for("development"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        assert!(LOGGER_INITIALIZED.get().is_some());
    }
}
