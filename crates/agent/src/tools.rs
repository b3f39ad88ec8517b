use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nl2sql_core::{RuleSet, Schema};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

pub const TOOL_NAME_PREFIX: &str = "redshift";
pub const CUSTOM_QUERY_ACTION: &str = "ExecuteCustomQuery";
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Connector entities exposed to the agent, each with LIST and GET.
const CONNECTOR_ENTITIES: &[&str] = &[
    "ordernumber",
    "shipmentnumber",
    "orders",
    "product",
    "shipment",
    "categorynames",
    "shipping_pickuptime",
];

const ENTITY_OPERATIONS: &[&str] = &["LIST", "GET"];

#[derive(Debug, Error)]
pub enum ToolsetError {
    #[error("{0} is required to build the connector toolset")]
    MissingSetting(&'static str),
    #[error("could not load service account file `{path}`: {source}")]
    ReadCredentials { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON in service account file `{path}`: {source}")]
    InvalidCredentials { path: PathBuf, source: serde_json::Error },
}

/// Where the connector's Google credentials come from, in lookup priority order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum CredentialSource {
    ServiceAccountFile(PathBuf),
    EnvironmentFile(PathBuf),
    DefaultCredentials(PathBuf),
    None,
}

impl CredentialSource {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// File to export as the credentials variable for the agent runtime, if any.
    pub fn credential_file(&self) -> Option<&Path> {
        match self {
            Self::ServiceAccountFile(path) | Self::EnvironmentFile(path) => Some(path),
            Self::DefaultCredentials(_) | Self::None => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::ServiceAccountFile(path) => format!("service account file {}", path.display()),
            Self::EnvironmentFile(path) => format!("{CREDENTIALS_ENV}={}", path.display()),
            Self::DefaultCredentials(path) => {
                format!("default gcloud credentials in {}", path.display())
            }
            Self::None => "no credentials found".to_string(),
        }
    }
}

pub fn resolve_credentials(service_account_path: &Path) -> CredentialSource {
    resolve_credentials_from(
        service_account_path,
        env::var_os(CREDENTIALS_ENV).map(PathBuf::from),
        env::var_os("HOME").map(PathBuf::from),
    )
}

/// Service-account file, then the env-named file, then `~/.config/gcloud`.
/// The first source that exists on disk wins.
pub fn resolve_credentials_from(
    service_account_path: &Path,
    env_credentials: Option<PathBuf>,
    home: Option<PathBuf>,
) -> CredentialSource {
    if service_account_path.is_file() {
        return CredentialSource::ServiceAccountFile(service_account_path.to_path_buf());
    }

    if let Some(path) = env_credentials.filter(|path| path.is_file()) {
        return CredentialSource::EnvironmentFile(path);
    }

    if let Some(gcloud) = home.map(|home| home.join(".config").join("gcloud")) {
        if gcloud.is_dir() {
            return CredentialSource::DefaultCredentials(gcloud);
        }
    }

    CredentialSource::None
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityOperations {
    pub entity: String,
    pub operations: Vec<String>,
}

/// Integration Connector binding for Redshift, as handed to the agent runtime.
#[derive(Clone, Debug)]
pub struct ConnectorToolset {
    project_id: String,
    location: String,
    connection: String,
    entity_operations: Vec<EntityOperations>,
    actions: Vec<String>,
    tool_instructions: String,
    credentials: CredentialSource,
    service_account_json: Option<SecretString>,
}

impl ConnectorToolset {
    pub fn new(
        project_id: &str,
        location: &str,
        connection: &str,
        service_account_path: &Path,
        schema: &Schema,
        rules: &RuleSet,
    ) -> Result<Self, ToolsetError> {
        if project_id.trim().is_empty() {
            return Err(ToolsetError::MissingSetting("project_id"));
        }
        if connection.trim().is_empty() {
            return Err(ToolsetError::MissingSetting("connection name"));
        }

        let credentials = resolve_credentials(service_account_path);
        let service_account_json = match &credentials {
            CredentialSource::ServiceAccountFile(path) => Some(load_service_account(path)?),
            _ => None,
        };

        let entity_operations = CONNECTOR_ENTITIES
            .iter()
            .map(|entity| EntityOperations {
                entity: entity.to_string(),
                operations: ENTITY_OPERATIONS.iter().map(|op| op.to_string()).collect(),
            })
            .collect();

        Ok(Self {
            project_id: project_id.to_string(),
            location: location.to_string(),
            connection: connection.to_string(),
            entity_operations,
            actions: vec![CUSTOM_QUERY_ACTION.to_string()],
            tool_instructions: tool_instructions(schema, rules),
            credentials,
            service_account_json,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn entity_operations(&self) -> &[EntityOperations] {
        &self.entity_operations
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn tool_instructions(&self) -> &str {
        &self.tool_instructions
    }

    pub fn credentials(&self) -> &CredentialSource {
        &self.credentials
    }

    pub fn has_service_account_json(&self) -> bool {
        self.service_account_json.is_some()
    }

    /// Tool names as the runtime registers them, e.g. `redshift_list_orders`.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for entry in &self.entity_operations {
            for operation in &entry.operations {
                names.push(format!(
                    "{TOOL_NAME_PREFIX}_{}_{}",
                    operation.to_ascii_lowercase(),
                    entry.entity
                ));
            }
        }
        names.push(format!("{TOOL_NAME_PREFIX}_execute_custom_query"));
        names
    }

    /// Request payload for the runtime bridge. Includes the service-account key.
    pub fn to_request_value(&self) -> Value {
        let service_account_json = self
            .service_account_json
            .as_ref()
            .and_then(|secret| serde_json::from_str::<Value>(secret.expose_secret()).ok())
            .unwrap_or(Value::Null);

        json!({
            "project": self.project_id,
            "location": self.location,
            "connection": self.connection,
            "entity_operations": self.entity_operations.iter()
                .map(|entry| (entry.entity.clone(), json!(entry.operations)))
                .collect::<serde_json::Map<_, _>>(),
            "actions": self.actions,
            "tool_name_prefix": TOOL_NAME_PREFIX,
            "tool_instructions": self.tool_instructions,
            "service_account_json": service_account_json,
        })
    }
}

fn load_service_account(path: &Path) -> Result<SecretString, ToolsetError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ToolsetError::ReadCredentials { path: path.to_path_buf(), source })?;
    serde_json::from_str::<Value>(&raw)
        .map_err(|source| ToolsetError::InvalidCredentials { path: path.to_path_buf(), source })?;
    Ok(raw.into())
}

fn tool_instructions(schema: &Schema, rules: &RuleSet) -> String {
    let tables = schema
        .tables
        .iter()
        .map(|table| format!("- {}: {}", table.name, table.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Execute SQL queries on AWS Redshift database through GCP Integration Connector.
Specialized for Revolve's e-commerce data analysis.

<Available Operations>
- LIST: Retrieve multiple records from a table
- GET: Retrieve specific records with filters
- {CUSTOM_QUERY_ACTION}: Execute custom SQL queries (preferred for complex analysis)

<Database Schema>
{tables}

<Critical Business Rules>
{rules}

<Usage Recommendations>
- Use {CUSTOM_QUERY_ACTION} for all analytical queries requiring JOINs or aggregations
- Always use fully qualified table names (schema.table_name)
- Follow Redshift SQL syntax and data types",
        rules = rules.render(),
    )
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use nl2sql_core::{business_rules, schema};
    use tempfile::TempDir;

    use super::{resolve_credentials_from, ConnectorToolset, CredentialSource, ToolsetError};

    fn toolset(path: &Path) -> Result<ConnectorToolset, ToolsetError> {
        ConnectorToolset::new(
            "demo-project",
            "us-central1",
            "redshift-demo-connection",
            path,
            &schema(),
            &business_rules(),
        )
    }

    #[test]
    fn credential_priority_prefers_service_account_file() {
        let dir = TempDir::new().expect("tempdir");
        let service_account = dir.path().join("sa.json");
        let env_file = dir.path().join("env.json");
        fs::write(&service_account, "{}").expect("write sa");
        fs::write(&env_file, "{}").expect("write env");
        fs::create_dir_all(dir.path().join(".config/gcloud")).expect("gcloud dir");

        let source = resolve_credentials_from(
            &service_account,
            Some(env_file.clone()),
            Some(dir.path().to_path_buf()),
        );
        assert_eq!(source, CredentialSource::ServiceAccountFile(service_account));

        let source = resolve_credentials_from(
            &dir.path().join("missing.json"),
            Some(env_file.clone()),
            Some(dir.path().to_path_buf()),
        );
        assert_eq!(source, CredentialSource::EnvironmentFile(env_file));
    }

    #[test]
    fn falls_back_to_gcloud_directory_then_none() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing.json");

        assert_eq!(
            resolve_credentials_from(&missing, Some(dir.path().join("nope.json")), None),
            CredentialSource::None
        );

        fs::create_dir_all(dir.path().join(".config/gcloud")).expect("gcloud dir");
        let source = resolve_credentials_from(&missing, None, Some(dir.path().to_path_buf()));
        assert!(matches!(source, CredentialSource::DefaultCredentials(_)));
        assert!(source.is_resolved());
        assert_eq!(source.credential_file(), None);
    }

    #[test]
    fn builds_entities_actions_and_tool_names() {
        let dir = TempDir::new().expect("tempdir");
        let toolset = toolset(&dir.path().join("missing.json")).expect("toolset");

        assert_eq!(toolset.entity_operations().len(), 7);
        let operations = toolset.entity_operations();
        assert!(operations.iter().all(|entry| entry.operations == ["LIST", "GET"]));
        assert_eq!(toolset.actions(), ["ExecuteCustomQuery".to_string()]);

        let names = toolset.tool_names();
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "redshift_list_ordernumber");
        assert_eq!(names.last().map(String::as_str), Some("redshift_execute_custom_query"));
    }

    #[test]
    fn tool_instructions_carry_the_business_rules() {
        let dir = TempDir::new().expect("tempdir");
        let toolset = toolset(&dir.path().join("missing.json")).expect("toolset");

        let instructions = toolset.tool_instructions();
        assert!(instructions.contains("5. LOST PACKAGES: Use extrastatus = 'lost package'"));
        assert!(instructions.contains("- bi_report.shipmentnumber_rs:"));
    }

    #[test]
    fn valid_service_account_is_loaded_and_forwarded() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("sa.json");
        fs::write(&path, r#"{"type": "service_account", "project_id": "demo-project"}"#)
            .expect("write sa");

        let toolset = toolset(&path).expect("toolset");
        assert!(toolset.has_service_account_json());
        assert_eq!(toolset.credentials().credential_file(), Some(path.as_path()));

        let request = toolset.to_request_value();
        assert_eq!(request["service_account_json"]["type"], "service_account");
        assert_eq!(request["entity_operations"]["orders"][1], "GET");
    }

    #[test]
    fn malformed_service_account_fails_construction() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("sa.json");
        fs::write(&path, "{not json").expect("write sa");

        let error = toolset(&path).expect_err("malformed json should fail");
        assert!(matches!(error, ToolsetError::InvalidCredentials { .. }));
        assert!(error.to_string().contains("invalid JSON in service account file"));
    }

    #[test]
    fn missing_connection_is_rejected() {
        let error = ConnectorToolset::new(
            "demo-project",
            "us-central1",
            "  ",
            &PathBuf::from("missing.json"),
            &schema(),
            &business_rules(),
        )
        .expect_err("blank connection should fail");
        assert!(matches!(error, ToolsetError::MissingSetting("connection name")));
    }
}
