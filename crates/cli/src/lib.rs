pub mod commands;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nl2sql_agent::runtime::Nl2SqlAgent;
use nl2sql_core::config::{AgentConfig, ConfigOverrides, LoadOptions};

use crate::commands::demo::DemoMode;
use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "nl2sql",
    about = "Natural language questions over the Redshift warehouse",
    long_about = "Ask questions in plain English; an LLM agent writes and runs Redshift SQL through \
                  a Google Cloud Integration Connector and explains the results.",
    after_help = "Examples:\n  nl2sql --validate\n  nl2sql --query \"How many Revolve orders shipped to the UK last month?\"\n  nl2sql --quick-demo --json"
)]
pub struct Cli {
    #[arg(long, help = "Path to the agent configuration file (JSON)")]
    config: Option<PathBuf>,
    #[arg(long, help = "GCP project ID (overrides config)")]
    project_id: Option<String>,
    #[arg(long, help = "Integration Connector name (overrides config)")]
    connection: Option<String>,
    #[arg(long, help = "GCP region (overrides config)")]
    location: Option<String>,
    #[arg(long, help = "LLM model identifier (overrides config)")]
    model: Option<String>,
    #[arg(long, help = "Log level: trace|debug|info|warn|error (overrides config)")]
    log_level: Option<String>,
    #[arg(long, help = "Validate agent setup")]
    validate: bool,
    #[arg(long, help = "Emit machine-readable JSON output")]
    json: bool,
    #[arg(long, help = "Run a single natural language query")]
    query: Option<String>,
    #[arg(long, requires = "query", help = "Additional context for --query")]
    context: Option<String>,
    #[arg(long, help = "Run all demo scenarios")]
    demo: bool,
    #[arg(long, help = "Run the core demo scenarios")]
    quick_demo: bool,
    #[arg(long, help = "Show the effective configuration with source attribution")]
    show_config: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            project_id: self.project_id.clone(),
            location: self.location.clone(),
            connection: self.connection.clone(),
            model: self.model.clone(),
            service_account_path: None,
            log_level: self.log_level.clone(),
        }
    }

    fn has_mode(&self) -> bool {
        self.demo || self.quick_demo || self.query.is_some()
    }
}

fn init_logging(config: &AgentConfig) {
    use nl2sql_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // Only the first initialization in a process installs the subscriber.
    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to initialize async runtime: {error}");
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(execute(cli));
    runtime.shutdown_background();
    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

/// Loads configuration, builds the agent and runs the selected mode.
pub async fn execute(cli: Cli) -> CommandResult {
    let overrides = cli.overrides();

    if cli.show_config {
        return commands::config::run(cli.config.as_deref(), &overrides);
    }

    let config = match AgentConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: false,
        overrides,
    }) {
        Ok(config) => config,
        Err(error) => return init_failure(&cli, "config_validation", error),
    };
    init_logging(&config);

    tracing::info!(
        event_name = "cli.agent.initializing",
        project_id = %config.project_id,
        connection = %config.connection,
        "initializing nl2sql agent"
    );
    let agent = match Nl2SqlAgent::from_config(&config) {
        Ok(agent) => agent,
        Err(error) => return init_failure(&cli, "agent_construction", error),
    };

    dispatch(&cli, &agent, &mut std::io::stdout()).await
}

/// Runs the selected mode against a ready agent.
///
/// A passing `--validate` report is written to `out` before the mode runs. With
/// `--json` it is only logged, so stdout carries a single JSON document.
pub async fn dispatch<W: Write>(cli: &Cli, agent: &Nl2SqlAgent, out: &mut W) -> CommandResult {
    if cli.validate {
        let validation = commands::validate::run(agent, cli.json);
        if validation.exit_code != 0 || !cli.has_mode() {
            return validation;
        }
        if cli.json {
            tracing::info!(event_name = "cli.validate.passed", "agent setup validation passed");
        } else {
            let _ = writeln!(out, "{}", validation.output);
        }
    }

    if cli.quick_demo {
        return commands::demo::run(agent, DemoMode::Quick, cli.json).await;
    }
    if cli.demo {
        return commands::demo::run(agent, DemoMode::Full, cli.json).await;
    }
    if let Some(question) = cli.query.as_deref() {
        return commands::query::run(agent, question, cli.context.as_deref(), cli.json).await;
    }

    commands::interactive::run(agent).await
}

fn init_failure(cli: &Cli, error_class: &str, error: impl std::fmt::Display) -> CommandResult {
    if cli.json {
        CommandResult::failure("init", error_class, error.to_string())
    } else {
        CommandResult::init_failure(error)
    }
}
