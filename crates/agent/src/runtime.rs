use std::path::{Path, PathBuf};

use nl2sql_core::config::{AgentConfig, ConfigError, LoadOptions};
use nl2sql_core::{
    build_agent_instructions, business_rules, sample_library, schema, FailureCategory, RuleSet,
    SampleLibrary, Schema,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::guardrails::{check_business_rule_compliance, pre_validate_question};
use crate::harness::demo_scenarios;
use crate::llm::{AgentRunner, BridgeSession, ProcessAgentRunner};
use crate::tools::{resolve_credentials, ConnectorToolset, ToolsetError};

pub const AGENT_NAME: &str = "nl2sql_redshift_agent";

/// Rendered business rules shorter than this count as not loaded.
const MIN_RULES_TEXT_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} is required")]
    MissingSetting(&'static str),
    #[error("failed to build connector toolset: {0}")]
    Toolset(#[from] ToolsetError),
    #[error("agent runtime unavailable: {0}")]
    Runner(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    pub project_id: String,
    pub location: String,
    pub connection: String,
    pub model: String,
    pub service_account_path: PathBuf,
}

impl From<&AgentConfig> for AgentSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            location: config.location.clone(),
            connection: config.connection.clone(),
            model: config.model.clone(),
            service_account_path: config.service_account_path.clone(),
        }
    }
}

/// Read-only reference data the agent is built around.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub schema: Schema,
    pub samples: SampleLibrary,
    pub rules: RuleSet,
}

impl Default for Catalog {
    fn default() -> Self {
        Self { schema: schema(), samples: sample_library(), rules: business_rules() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub success: bool,
    pub question: String,
    pub response: Option<String>,
    pub error: Option<String>,
    pub suggestions: Vec<String>,
    pub violations: Vec<String>,
    pub compliant: bool,
    pub troubleshooting: Vec<String>,
    pub context: Option<String>,
    pub correlation_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetupCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<SetupCheck>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.overall_status == CheckStatus::Pass
    }

    fn from_checks(checks: Vec<(SetupCheck, Option<String>)>) -> Self {
        let mut errors = Vec::new();
        let mut collected = Vec::with_capacity(checks.len());
        for (check, error) in checks {
            errors.extend(error);
            collected.push(check);
        }

        let passed = collected.iter().filter(|check| check.status == CheckStatus::Pass).count();
        let all_pass = passed == collected.len();
        Self {
            overall_status: if all_pass { CheckStatus::Pass } else { CheckStatus::Fail },
            summary: format!("{passed}/{} setup checks passed", collected.len()),
            checks: collected,
            errors,
        }
    }
}

/// Entry point for asking questions of the warehouse through the agent runtime.
pub struct Nl2SqlAgent {
    settings: AgentSettings,
    catalog: Catalog,
    toolset: ConnectorToolset,
    instructions: String,
    runner: Box<dyn AgentRunner>,
}

impl std::fmt::Debug for Nl2SqlAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nl2SqlAgent")
            .field("settings", &self.settings)
            .field("toolset", &self.toolset)
            .finish_non_exhaustive()
    }
}

impl Nl2SqlAgent {
    pub fn new(
        settings: AgentSettings,
        runner: impl AgentRunner + 'static,
    ) -> Result<Self, AgentError> {
        Self::with_catalog(settings, Catalog::default(), runner)
    }

    pub fn with_catalog(
        settings: AgentSettings,
        catalog: Catalog,
        runner: impl AgentRunner + 'static,
    ) -> Result<Self, AgentError> {
        let (toolset, instructions) = prepare(&settings, &catalog)?;
        Self::assemble(settings, catalog, toolset, instructions, Box::new(runner))
    }

    /// Builds the agent with a [`ProcessAgentRunner`] driving `config.agent_command`.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let settings = AgentSettings::from(config);
        let catalog = Catalog::default();
        let (toolset, instructions) = prepare(&settings, &catalog)?;

        let session = BridgeSession {
            agent_name: AGENT_NAME.to_string(),
            model: settings.model.clone(),
            project_id: settings.project_id.clone(),
            location: settings.location.clone(),
            instructions: instructions.clone(),
            toolset: toolset.to_request_value(),
        };
        let credential_file = toolset.credentials().credential_file().map(Path::to_path_buf);
        let runner =
            ProcessAgentRunner::new(config.agent_command.clone(), credential_file, session);

        Self::assemble(settings, catalog, toolset, instructions, Box::new(runner))
    }

    pub fn load(options: LoadOptions) -> Result<Self, AgentError> {
        let config = AgentConfig::load(options)?;
        Self::from_config(&config)
    }

    fn assemble(
        settings: AgentSettings,
        catalog: Catalog,
        toolset: ConnectorToolset,
        instructions: String,
        runner: Box<dyn AgentRunner>,
    ) -> Result<Self, AgentError> {
        if !runner.is_available() {
            return Err(AgentError::Runner("no agent runtime command configured".to_string()));
        }

        for issue in catalog.schema.check_relationships() {
            warn!(
                event_name = "agent.catalog.relationship_issue",
                issue = %issue,
                "catalog relationship does not match tables"
            );
        }

        info!(
            event_name = "agent.initialized",
            project_id = %settings.project_id,
            connection = %settings.connection,
            model = %settings.model,
            credentials = %toolset.credentials().describe(),
            "nl2sql agent ready"
        );

        Ok(Self { settings, catalog, toolset, instructions, runner })
    }

    pub async fn process_question(&self, question: &str, context: Option<&str>) -> QuestionResult {
        let correlation_id = Uuid::new_v4().to_string();
        let context = context.map(str::to_string);

        if question.trim().is_empty() {
            warn!(
                event_name = "agent.question.rejected",
                correlation_id = %correlation_id,
                "blank question"
            );
            return QuestionResult {
                success: false,
                question: question.to_string(),
                response: None,
                error: Some("Question cannot be empty".to_string()),
                suggestions: Vec::new(),
                violations: Vec::new(),
                compliant: true,
                troubleshooting: Vec::new(),
                context,
                correlation_id,
            };
        }

        let pre_validation = pre_validate_question(question);
        info!(
            event_name = "agent.question.received",
            correlation_id = %correlation_id,
            suggestions = pre_validation.suggestions.len(),
            "processing question"
        );

        match self.runner.run(question).await {
            Ok(response) => {
                let compliance = check_business_rule_compliance(question, &response);
                if !compliance.compliant {
                    warn!(
                        event_name = "agent.question.non_compliant",
                        correlation_id = %correlation_id,
                        violations = compliance.violations.len(),
                        "answer does not follow every business rule"
                    );
                }
                info!(
                    event_name = "agent.question.answered",
                    correlation_id = %correlation_id,
                    "question answered"
                );

                QuestionResult {
                    success: true,
                    question: question.to_string(),
                    response: Some(response),
                    error: None,
                    suggestions: pre_validation.suggestions,
                    violations: compliance.violations,
                    compliant: compliance.compliant,
                    troubleshooting: Vec::new(),
                    context,
                    correlation_id,
                }
            }
            Err(error) => {
                let message = format!("{error:#}");
                let category = FailureCategory::classify(&message);
                warn!(
                    event_name = "agent.question.failed",
                    correlation_id = %correlation_id,
                    category = category.as_str(),
                    error = %message,
                    "agent runtime failed"
                );

                QuestionResult {
                    success: false,
                    question: question.to_string(),
                    response: None,
                    error: Some(message),
                    suggestions: pre_validation.suggestions,
                    violations: Vec::new(),
                    compliant: true,
                    troubleshooting: category.suggestions(),
                    context,
                    correlation_id,
                }
            }
        }
    }

    /// Runs every readiness check; a failing check never hides the ones after it.
    pub fn validate_setup(&self) -> ValidationReport {
        let mut checks = Vec::new();

        checks.push(check(
            "agent_initialized",
            self.runner.is_available(),
            format!("agent `{AGENT_NAME}` using model {}", self.settings.model),
            "Agent runtime is not initialized".to_string(),
        ));

        let tool_count = self.toolset.tool_names().len();
        checks.push(check(
            "tools_available",
            tool_count > 0,
            format!("{tool_count} connector tools on `{}`", self.toolset.connection()),
            "Redshift connector tools are not available".to_string(),
        ));

        checks.push(check(
            "schema_loaded",
            !self.catalog.schema.is_empty(),
            format!("{} tables", self.catalog.schema.tables.len()),
            "Schema catalog is empty".to_string(),
        ));

        checks.push(check(
            "sample_queries_loaded",
            !self.catalog.samples.is_empty(),
            format!("{} sample queries", self.catalog.samples.len()),
            "Sample query library is empty".to_string(),
        ));

        let rules_len = self.catalog.rules.render().len();
        checks.push(check(
            "business_rules_loaded",
            rules_len > MIN_RULES_TEXT_LEN,
            format!("{} rules", self.catalog.rules.len()),
            format!("Business rules text is too short ({rules_len} chars)"),
        ));

        let credentials = resolve_credentials(&self.settings.service_account_path);
        checks.push(check(
            "authentication",
            credentials.is_resolved(),
            credentials.describe(),
            format!(
                "No authentication method found: service account file {} is missing, \
                 GOOGLE_APPLICATION_CREDENTIALS is unset or invalid, and no gcloud default credentials exist",
                self.settings.service_account_path.display()
            ),
        ));

        let issues = self.catalog.schema.check_relationships();
        checks.push(check(
            "relationships_consistent",
            issues.is_empty(),
            format!("{} relationships checked", self.catalog.schema.relationships.len()),
            format!(
                "Relationship definitions do not match the catalog: {}",
                issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
            ),
        ));

        let report = ValidationReport::from_checks(checks);
        info!(
            event_name = "agent.setup.validated",
            passed = report.passed(),
            summary = %report.summary,
            "setup validation finished"
        );
        report
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn toolset(&self) -> &ConnectorToolset {
        &self.toolset
    }

    pub fn schema(&self) -> &Schema {
        &self.catalog.schema
    }

    pub fn samples(&self) -> &SampleLibrary {
        &self.catalog.samples
    }

    pub fn rules(&self) -> &RuleSet {
        &self.catalog.rules
    }

    pub fn demo_questions(&self) -> Vec<&'static str> {
        demo_scenarios().iter().map(|scenario| scenario.question).collect()
    }
}

fn prepare(
    settings: &AgentSettings,
    catalog: &Catalog,
) -> Result<(ConnectorToolset, String), AgentError> {
    if settings.project_id.trim().is_empty() {
        return Err(AgentError::MissingSetting("project_id"));
    }
    if settings.connection.trim().is_empty() {
        return Err(AgentError::MissingSetting("connection"));
    }

    let toolset = ConnectorToolset::new(
        &settings.project_id,
        &settings.location,
        &settings.connection,
        &settings.service_account_path,
        &catalog.schema,
        &catalog.rules,
    )?;
    let instructions = build_agent_instructions(&catalog.schema, &catalog.rules);
    Ok((toolset, instructions))
}

fn check(
    name: &'static str,
    passed: bool,
    details: String,
    failure: String,
) -> (SetupCheck, Option<String>) {
    if passed {
        (SetupCheck { name, status: CheckStatus::Pass, details }, None)
    } else {
        (SetupCheck { name, status: CheckStatus::Fail, details: failure.clone() }, Some(failure))
    }
}
