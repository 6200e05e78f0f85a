pub mod can;
pub mod config;
pub mod migrate;
pub mod predefined_route;
pub mod route;
pub mod seed;

use std::future::Future;

use orderdesk_core::config::{AppConfig, LoadOptions};
use orderdesk_core::{ApplicationError, InterfaceError};
use orderdesk_db::{connect, DbPool};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps a domain failure onto the interface taxonomy; only the
    /// user-facing message and a fresh correlation id leave the process.
    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        tracing::warn!(
            event_name = "cli.command.failed",
            command,
            correlation_id = %correlation_id,
            error = %error,
            "command failed"
        );

        let interface = error.into_interface(correlation_id.clone());
        let (error_class, exit_code) = match &interface {
            InterfaceError::BadRequest { .. } => ("bad_request", 10),
            InterfaceError::NotFound { .. } => ("not_found", 11),
            InterfaceError::Forbidden { .. } => ("forbidden", 12),
            InterfaceError::Internal { .. } => ("internal", 13),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: interface.user_message(),
            correlation_id: Some(correlation_id),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Why a database-backed command stopped early.
#[derive(Debug)]
pub enum CommandFailure {
    Infrastructure { error_class: &'static str, message: String, exit_code: u8 },
    Application(ApplicationError),
}

impl CommandFailure {
    pub fn infrastructure(
        error_class: &'static str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::Infrastructure { error_class, message: message.into(), exit_code }
    }

    fn into_result(self, command: &str) -> CommandResult {
        match self {
            Self::Infrastructure { error_class, message, exit_code } => {
                CommandResult::failure(command, error_class, message, exit_code)
            }
            Self::Application(error) => CommandResult::from_application_error(command, error),
        }
    }
}

impl From<ApplicationError> for CommandFailure {
    fn from(value: ApplicationError) -> Self {
        Self::Application(value)
    }
}

/// Loads config, opens the pool on a current-thread runtime and hands it to
/// `work`. Config, runtime and connectivity failures use exit codes 2, 3, 4.
pub fn run_with_pool<T, F, Fut>(command: &str, work: F) -> Result<T, CommandResult>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<T, CommandFailure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| CommandFailure::infrastructure("db_connectivity", error.to_string(), 4))?;

        let outcome = work(pool.clone()).await;
        pool.close().await;
        outcome
    });

    result.map_err(|failure| failure.into_result(command))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
