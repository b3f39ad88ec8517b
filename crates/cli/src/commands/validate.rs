use nl2sql_agent::runtime::{CheckStatus, Nl2SqlAgent, ValidationReport};

use super::{to_json, CommandResult};

pub fn run(agent: &Nl2SqlAgent, json_output: bool) -> CommandResult {
    let report = agent.validate_setup();
    let exit_code = if report.passed() { 0 } else { 1 };

    let output = if json_output { to_json("validate", &report) } else { render_human(&report) };
    CommandResult::new(exit_code, output)
}

fn render_human(report: &ValidationReport) -> String {
    let mut lines = Vec::new();
    lines.push(if report.passed() {
        "Agent setup validation passed".to_string()
    } else {
        "Agent setup validation failed".to_string()
    });
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    if !report.errors.is_empty() {
        lines.push("Errors:".to_string());
        lines.extend(report.errors.iter().map(|error| format!("  - {error}")));
    }

    lines.join("\n")
}
