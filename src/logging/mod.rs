/*!
 * Logging Module
 * tracing subscriber setup: rolling files plus console
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::Environment;

const LOG_DIR: &str = "logs";

/// Default filter directives when `RUST_LOG` is not set.
fn default_directives(level: &str) -> String {
    format!(
        "gsgroups_backend={},tower_http=debug,axum=debug,sqlx=warn",
        level
    )
}

/// Initialize the logging system.
///
/// The returned guards flush the background writers when dropped, so the
/// caller keeps them alive for as long as the process runs.
pub fn init(environment: Environment) -> Vec<WorkerGuard> {
    let is_production = environment == Environment::Production;

    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("could not create log directory '{}': {}", LOG_DIR, e);
    }

    let (file_writer, file_guard) = non_blocking(rolling::daily(LOG_DIR, "app.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());
    let mut guards = vec![file_guard, console_guard];

    let log_level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| if is_production { "info" } else { "debug" }.to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&log_level)));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if is_production {
        let (error_writer, error_guard) = non_blocking(rolling::daily(LOG_DIR, "error.log"));
        guards.push(error_guard);

        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = fmt::layer()
            .json()
            .with_writer(error_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        // try_init: a second call (tests, embedding) must not panic
        let _ = subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .try_init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        let _ = subscriber.with(file_layer).with(console_layer).try_init();
    }

    tracing::info!(
        environment = environment.as_str(),
        level = %log_level,
        "logging initialized"
    );

    guards
}
