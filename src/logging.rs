// Logging setup
// env_logger backend, level adjustable after the config has loaded

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;

/// Install the global logger at `info`.
///
/// The backend accepts everything and `log::set_max_level` does the
/// filtering, so the level can change once the configuration is known.
pub fn init() {
    let style = if atty::is(atty::Stream::Stderr) {
        WriteStyle::Auto
    } else {
        WriteStyle::Never
    };

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Trace).write_style(style);

    let from_env = std::env::var_os("RUST_LOG").is_some();
    if from_env {
        builder.parse_default_env();
    }

    if let Err(e) = builder.try_init() {
        eprintln!("Failed to initialise logger: {}", e);
        return;
    }

    if !from_env {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Apply the configured severity unless RUST_LOG already decided it
pub fn apply_severity(severity: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        log::debug!("RUST_LOG is set, ignoring logging.severity");
        return;
    }

    let level = severity_or_debug(severity);
    log::set_max_level(level);
    log::info!("Set logger severity to {}", level);
}

/// Configured level, or `debug` when the value is not a known severity
fn severity_or_debug(severity: &str) -> LevelFilter {
    parse_severity(severity).unwrap_or_else(|| {
        log::error!(
            "Failed to set logger severity to {}, falling back to DEBUG",
            severity
        );
        LevelFilter::Debug
    })
}

fn parse_severity(severity: &str) -> Option<LevelFilter> {
    match severity.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" | "success" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" | "critical" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}
