// ==========================================
// Materiales Costing - Logging
// ==========================================
// tracing-subscriber registry: EnvFilter + fmt layer,
// human-readable or JSON lines.
// ==========================================

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Env var selecting the output format ("json" or "text")
pub const LOG_FORMAT_ENV: &str = "MATERIALES_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Unknown or missing values fall back to text
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

/// Installs the global subscriber.
///
/// - `RUST_LOG`: filter directive, default `info`
///   (e.g. `RUST_LOG=materiales_costing::excel=debug`)
/// - `MATERIALES_LOG_FORMAT=json`: one JSON object per event
///
/// ```no_run
/// materiales_costing::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

/// Debug-level subscriber on the test writer; later calls are no-ops
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
