//! Tracing bootstrap for the simulation binary and embedding hosts.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "danci_practice=info";

/// Keeps the non-blocking file writer alive; drop it last
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Where and whether practice logs are mirrored to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub file_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl LogSettings {
    pub fn from_env() -> Self {
        let directive = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_DIRECTIVE.to_string());
        let file_dir = if flag_enabled(std::env::var("ENABLE_FILE_LOGS").ok().as_deref()) {
            Some(PathBuf::from(
                std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
            ))
        } else {
            None
        };

        Self {
            directive,
            file_dir,
            file_prefix: "practice.log".to_string(),
        }
    }

    /// Invalid directives fall back to the crate default
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
    }
}

fn flag_enabled(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

/// Install the global subscriber: stdout always, plus a daily rolling file
/// when `settings.file_dir` is set and can be created.
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let stdout_layer = fmt::layer().with_target(true);

    if let Some(dir) = &settings.file_dir {
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::DAILY, dir, &settings.file_prefix);
                let (file_writer, guard) = tracing_appender::non_blocking(appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(settings.env_filter())
                    .with(stdout_layer)
                    .with(file_layer)
                    .init();

                return Some(FileLogGuard { _guard: guard });
            }
            Err(err) => eprintln!("failed to create log directory {}: {err}", dir.display()),
        }
    }

    tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(stdout_layer)
        .init();

    None
}
