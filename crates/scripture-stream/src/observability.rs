use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

/// Where log records go.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogTarget {
    Disabled,
    /// Compact human-readable lines on stderr.
    Console,
    /// JSON lines appended to `dir/file_name`.
    JsonFile { dir: PathBuf, file_name: String },
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn resolve_log_target(enabled: Option<&str>, json_path: Option<&str>) -> LogTarget {
    if enabled.and_then(parse_bool_env) == Some(false) {
        return LogTarget::Disabled;
    }
    let Some(raw) = json_path.map(str::trim).filter(|p| !p.is_empty()) else {
        return LogTarget::Console;
    };
    let path = Path::new(raw);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("scripture.logs.jsonl")
        .to_string();
    LogTarget::JsonFile { dir, file_name }
}

fn resolve_env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var("SCRIPTURE_LOG_LEVEL")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `SCRIPTURE_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `SCRIPTURE_LOG_LEVEL`: optional level/filter override (`info`, `debug`, etc.).
/// - `SCRIPTURE_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr so they never mix with an answer streamed to stdout.
/// - `RUST_LOG`: optional filter override.
///
/// `default_level` applies when neither filter variable is set.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| {
        let enabled = std::env::var("SCRIPTURE_OBSERVABILITY_ENABLED").ok();
        let json_path = std::env::var("SCRIPTURE_JSON_LOG_PATH").ok();
        let target = resolve_log_target(enabled.as_deref(), json_path.as_deref());
        let env_filter = resolve_env_filter(default_level);

        match target {
            LogTarget::Disabled => {}
            LogTarget::Console => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
            LogTarget::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(&dir, file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
        }
    });
}
