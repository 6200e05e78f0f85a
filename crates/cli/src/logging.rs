use orderdesk_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber. Events go to stderr so stdout stays a
/// single JSON payload per command.
pub fn init_logging(config: &LoggingConfig) {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(event_name = "cli.logging.already_installed", "subscriber already set");
    }
}

/// Falls back to default logging when the config cannot be loaded; the
/// command itself reports the config error.
pub fn init_from_env() {
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);
}
