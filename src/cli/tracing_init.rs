//! Subscriber setup for `-v` levels and the `REST_LOG*` variables.

use crate::constants;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Everything outside this crate stays at `error` whatever the verbosity.
const BASE_DIRECTIVE: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// Filter for a `-v` count, scoped to this crate's own targets.
///
/// `-v` shows each attempt with its URL and status, `-vv` adds headers and
/// `-vvv` adds bodies. Without `-v`, `REST_LOG` is used as is.
fn filter_directive(verbosity: u8, env_directive: Option<String>) -> String {
    let level = match verbosity {
        0 => return env_directive.unwrap_or_else(|| BASE_DIRECTIVE.to_string()),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("{BASE_DIRECTIVE},rest::http={level},rest_cli={level}")
}

fn log_format(raw: Option<String>) -> LogFormat {
    match raw.map(|s| s.to_lowercase()).as_deref() {
        None | Some("text") => LogFormat::Text,
        Some("json") => LogFormat::Json,
        Some(other) => {
            // no subscriber yet, stderr is all there is
            // ast-grep-ignore: no-println
            eprintln!(
                "Warning: Unrecognized {} '{other}'. Valid values: 'json', 'text'. Using 'text'.",
                constants::ENV_LOG_FORMAT
            );
            LogFormat::Text
        }
    }
}

/// Appends to `REST_LOG_FILE` when it is set and can be opened.
fn log_writer() -> BoxMakeWriter {
    let Ok(path) = std::env::var(constants::ENV_LOG_FILE) else {
        return BoxMakeWriter::new(std::io::stderr);
    };
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(e) => {
            // ast-grep-ignore: no-println
            eprintln!("Warning: Could not open log file '{path}': {e}. Using stderr.");
            BoxMakeWriter::new(std::io::stderr)
        }
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_tracing(verbosity: u8) {
    let directive = filter_directive(verbosity, std::env::var(constants::ENV_LOG).ok());
    let env_filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(BASE_DIRECTIVE));

    let writer = log_writer();
    let layer: Box<dyn Layer<Registry> + Send + Sync> =
        match log_format(std::env::var(constants::ENV_LOG_FORMAT).ok()) {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_span_list(false)
                .with_line_number(true)
                .with_writer(writer)
                .boxed(),
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(writer)
                .boxed(),
        };

    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init();
}
