use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROJECT_ID_ENV: &str = "GCP_PROJECT_ID";
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const LOG_LEVEL_ENV: &str = "NL2SQL_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "NL2SQL_LOG_FORMAT";

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["config/agent_config.json", "agent_config.json"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    pub project_id: String,
    pub location: String,
    pub connection: String,
    pub model: String,
    pub service_account_path: PathBuf,
    /// Program (and leading arguments) hosting the LLM agent runtime.
    pub agent_command: Vec<String>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub connection: Option<String>,
    pub model: Option<String>,
    pub service_account_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: "us-central1".to_string(),
            connection: "redshift-demo-connection".to_string(),
            model: "gemini-2.0-flash".to_string(),
            service_account_path: PathBuf::from("config/service_account.json"),
            agent_command: vec!["nl2sql-agent-bridge".to_string()],
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AgentConfig {
    /// Defaults, then environment fallbacks, then the JSON file, then overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_defaults()?;

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options
                .config_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_env_defaults(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env(PROJECT_ID_ENV) {
            self.project_id = value;
        }
        if let Some(value) = read_env(CREDENTIALS_ENV) {
            self.service_account_path = PathBuf::from(value);
        }
        if let Some(value) = read_env(LOG_LEVEL_ENV) {
            self.logging.level = value;
        }
        if let Some(value) = read_env(LOG_FORMAT_ENV) {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(connection) = patch.connection {
            self.connection = connection;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(service_account_path) = patch.service_account_path {
            self.service_account_path = service_account_path;
        }
        if let Some(agent_command) = patch.agent_command {
            self.agent_command = agent_command;
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(project_id) = overrides.project_id {
            self.project_id = project_id;
        }
        if let Some(location) = overrides.location {
            self.location = location;
        }
        if let Some(connection) = overrides.connection {
            self.connection = connection;
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(service_account_path) = overrides.service_account_path {
            self.service_account_path = service_account_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_project(self)?;
        validate_agent_command(&self.agent_command)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First existing candidate: the explicit path if given, else the default locations.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    serde_json::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_project(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.project_id.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "project_id is required. Set it in the config file, pass --project-id, or export {PROJECT_ID_ENV}"
        )));
    }
    if config.connection.trim().is_empty() {
        return Err(ConfigError::Validation(
            "connection is required (name of the Integration Connector for Redshift)".to_string(),
        ));
    }
    if config.location.trim().is_empty() {
        return Err(ConfigError::Validation("location must not be empty".to_string()));
    }
    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model must not be empty".to_string()));
    }
    Ok(())
}

fn validate_agent_command(command: &[String]) -> Result<(), ConfigError> {
    let missing = command.first().map(|program| program.trim().is_empty()).unwrap_or(true);
    if missing {
        return Err(ConfigError::Validation(
            "agent_command must name the program that hosts the agent runtime".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Keys not listed here are ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    project_id: Option<String>,
    location: Option<String>,
    connection: Option<String>,
    model: Option<String>,
    service_account_path: Option<PathBuf>,
    agent_command: Option<Vec<String>>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{
        AgentConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, CREDENTIALS_ENV,
        LOG_FORMAT_ENV, LOG_LEVEL_ENV, PROJECT_ID_ENV,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    const ALL_VARS: &[&str] = &[PROJECT_ID_ENV, CREDENTIALS_ENV, LOG_LEVEL_ENV, LOG_FORMAT_ENV];

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, body: &str) -> Result<PathBuf, String> {
        let path = dir.path().join("agent_config.json");
        fs::write(&path, body).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn file_values_override_environment_defaults() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);
        env::set_var(PROJECT_ID_ENV, "from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"{"project_id": "from-file", "connection": "warehouse-conn", "unknown": 1}"#,
            )?;

            let config =
                AgentConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.project_id == "from-file", "file project id should win over env")?;
            ensure(config.connection == "warehouse-conn", "file connection should be used")?;
            ensure(config.location == "us-central1", "default location should remain")?;
            ensure(config.model == "gemini-2.0-flash", "default model should remain")?;
            Ok(())
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn environment_supplies_project_and_credentials_without_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);
        env::set_var(PROJECT_ID_ENV, "env-project");
        env::set_var(CREDENTIALS_ENV, "/tmp/creds.json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let config = AgentConfig::load(LoadOptions {
                config_path: Some(dir.path().join("missing.json")),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.project_id == "env-project", "project id should come from env")?;
            ensure(
                config.service_account_path == PathBuf::from("/tmp/creds.json"),
                "credentials path should come from env",
            )?;
            Ok(())
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn overrides_win_over_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"{"project_id": "from-file", "connection": "file-conn", "logging": {"level": "warn", "format": "json"}}"#,
        )?;

        let config = AgentConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                project_id: Some("from-cli".to_string()),
                connection: Some("cli-conn".to_string()),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.project_id == "from-cli", "override project id should win")?;
        ensure(config.connection == "cli-conn", "override connection should win")?;
        ensure(config.logging.level == "debug", "override log level should win")?;
        ensure(matches!(config.logging.format, LogFormat::Json), "file log format should apply")
    }

    #[test]
    fn malformed_json_is_a_hard_failure() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, r#"{"project_id": "oops",,}"#)?;

        let error = match AgentConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected parse failure".to_string()),
            Err(error) => error,
        };
        ensure(matches!(error, ConfigError::ParseFile { .. }), "expected ParseFile error")
    }

    #[test]
    fn missing_project_id_fails_with_actionable_message() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, r#"{"project_id": "   "}"#)?;

        let error = match AgentConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains(PROJECT_ID_ENV)),
            "validation failure should mention the project id variable",
        )
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);
        env::set_var(PROJECT_ID_ENV, "env-project");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let error = match AgentConfig::load(LoadOptions {
                config_path: Some(dir.path().join("absent.json")),
                require_file: true,
                ..LoadOptions::default()
            }) {
                Ok(_) => return Err("expected missing file error".to_string()),
                Err(error) => error,
            };
            ensure(matches!(error, ConfigError::MissingConfigFile(_)), "expected MissingConfigFile")
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);
        env::set_var("TEST_NL2SQL_CONNECTION", "interpolated-conn");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"{"project_id": "p", "connection": "${TEST_NL2SQL_CONNECTION}", "agent_command": ["python", "-m", "bridge"]}"#,
            )?;
            let config =
                AgentConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.connection == "interpolated-conn", "connection should be interpolated")?;
            ensure(config.agent_command.len() == 3, "agent command should be read from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_NL2SQL_CONNECTION"]);
        result
    }

    #[test]
    fn logging_env_values_are_validated() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);
        env::set_var(PROJECT_ID_ENV, "env-project");
        env::set_var(LOG_FORMAT_ENV, "xml");

        let result = match AgentConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected log format failure".to_string()),
            Err(error) => ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("log format")),
                "error should mention the log format",
            ),
        };

        clear_vars(ALL_VARS);
        result
    }
}
