use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nl2sql_core::config::{
    resolve_config_path, AgentConfig, ConfigOverrides, LoadOptions, CREDENTIALS_ENV,
    LOG_FORMAT_ENV, LOG_LEVEL_ENV, PROJECT_ID_ENV,
};
use serde_json::Value;

use super::CommandResult;

pub fn run(config_path: Option<&Path>, overrides: &ConfigOverrides) -> CommandResult {
    let config = match AgentConfig::load(LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: false,
        overrides: overrides.clone(),
    }) {
        Ok(config) => config,
        Err(error) => return CommandResult::new(1, format!("config validation failed: {error}")),
    };

    let file_path = resolve_config_path(config_path);
    let sources = Sources { file_doc: load_config_file_doc(file_path.as_deref()), file_path };

    let mut lines =
        vec!["effective config (source precedence: cli > file > env > default):".to_string()];

    lines.push(sources.line(
        "project_id",
        &config.project_id,
        Some(PROJECT_ID_ENV),
        overrides.project_id.is_some(),
    ));
    lines.push(sources.line("location", &config.location, None, overrides.location.is_some()));
    lines.push(sources.line(
        "connection",
        &config.connection,
        None,
        overrides.connection.is_some(),
    ));
    lines.push(sources.line("model", &config.model, None, overrides.model.is_some()));
    lines.push(sources.line(
        "service_account_path",
        &config.service_account_path.display().to_string(),
        Some(CREDENTIALS_ENV),
        overrides.service_account_path.is_some(),
    ));
    lines.push(sources.line("agent_command", &config.agent_command.join(" "), None, false));
    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        Some(LOG_LEVEL_ENV),
        overrides.log_level.is_some(),
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        Some(LOG_FORMAT_ENV),
        false,
    ));

    CommandResult::new(0, lines.join("\n"))
}

struct Sources {
    file_path: Option<PathBuf>,
    file_doc: Option<Value>,
}

impl Sources {
    fn line(&self, key: &str, value: &str, env_key: Option<&str>, overridden: bool) -> String {
        let source = self.field_source(key, env_key, overridden);
        format!("- {key} = {value} (source: {source})")
    }

    fn field_source(&self, key_path: &str, env_key: Option<&str>, overridden: bool) -> String {
        if overridden {
            return "cli".to_string();
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        if let Some(env_key) = env_key {
            if env::var(env_key).is_ok_and(|value| !value.trim().is_empty()) {
                return format!("env ({env_key})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<Value>(&raw).ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
