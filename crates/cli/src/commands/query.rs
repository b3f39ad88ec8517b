use nl2sql_agent::runtime::{Nl2SqlAgent, QuestionResult};

use super::{to_json, CommandResult};

pub async fn run(
    agent: &Nl2SqlAgent,
    question: &str,
    context: Option<&str>,
    json_output: bool,
) -> CommandResult {
    let result = agent.process_question(question, context).await;
    let exit_code = if result.success { 0 } else { 1 };

    let output = if json_output {
        to_json("query", &result)
    } else {
        format!("Processing query: {question}\n{}", render_result(&result))
    };
    CommandResult::new(exit_code, output)
}

pub fn render_result(result: &QuestionResult) -> String {
    let mut lines = Vec::new();

    if result.success {
        lines.push("Query executed successfully".to_string());
        lines.push(format!("Response: {}", result.response.as_deref().unwrap_or_default()));
    } else {
        lines.push("Query execution failed".to_string());
        lines.push(format!("Error: {}", result.error.as_deref().unwrap_or("Unknown error")));
    }

    if !result.suggestions.is_empty() {
        lines.push("Suggestions:".to_string());
        lines.extend(result.suggestions.iter().map(|hint| format!("  - {hint}")));
    }
    if !result.violations.is_empty() {
        lines.push("Business rule violations:".to_string());
        lines.extend(result.violations.iter().map(|violation| format!("  - {violation}")));
    }
    if !result.troubleshooting.is_empty() {
        lines.push("Troubleshooting:".to_string());
        lines.extend(result.troubleshooting.iter().map(|tip| format!("  - {tip}")));
    }

    lines.join("\n")
}
