pub mod chat;
pub mod config;
pub mod doctor;
pub mod migrate;

use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME_INIT: u8 = 3;
pub const EXIT_DATABASE: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: Option<&'a str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload =
            CommandOutcome { command, status: "ok", error_class: None, message: message.into() };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Plain text output, for commands whose result is meant for a person.
    pub fn text(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }
}

/// Failure raised while preparing a command, tagged with its error class
/// and exit code.
#[derive(Debug)]
pub(crate) struct Setup {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl Setup {
    pub fn config(message: impl Into<String>) -> Self {
        Self { error_class: "config_validation", message: message.into(), exit_code: EXIT_CONFIG }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self { error_class: "runtime_init", message: message.into(), exit_code: EXIT_RUNTIME_INIT }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self { error_class: "db_connectivity", message: message.into(), exit_code: EXIT_DATABASE }
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self { error_class: "migration", message: message.into(), exit_code: EXIT_MIGRATION }
    }

    pub fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(command, self.error_class, self.message, self.exit_code)
    }
}

pub(crate) fn current_thread_runtime() -> Result<tokio::runtime::Runtime, Setup> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| Setup::runtime(format!("failed to initialize async runtime: {error}")))
}

fn serialize_payload(payload: &CommandOutcome<'_>) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
