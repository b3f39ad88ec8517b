pub mod config;
pub mod demo;
pub mod interactive;
pub mod query;
pub mod validate;

use serde::Serialize;

pub const INIT_TIPS: &[&str] = &[
    "Check that the service account file exists and contains valid JSON",
    "Verify the Integration Connector for Redshift is active",
    "Ensure the service account has Integration Connectors and Vertex AI IAM roles",
    "Set the project with --project-id or GCP_PROJECT_ID",
];

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
}

impl CommandResult {
    pub fn new(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }

    pub fn failure(command: &str, error_class: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code: 1, output: serialize_payload(payload) }
    }

    /// Human-readable initialization failure with remediation tips.
    pub fn init_failure(message: impl std::fmt::Display) -> Self {
        let mut lines = vec![format!("Failed to initialize agent: {message}"), String::new()];
        lines.push("Troubleshooting tips:".to_string());
        lines.extend(
            INIT_TIPS.iter().enumerate().map(|(index, tip)| format!("  {}. {tip}", index + 1)),
        );
        Self { exit_code: 1, output: lines.join("\n") }
    }
}

pub(crate) fn to_json<T: Serialize>(command: &str, value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        serialize_payload(CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some("serialization".to_string()),
            message: error.to_string(),
        })
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
