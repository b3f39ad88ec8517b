use nl2sql_agent::harness::{DemoOutcome, DemoRunner, DemoSummary};
use nl2sql_agent::runtime::Nl2SqlAgent;
use serde::Serialize;

use super::query::render_result;
use super::{to_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoMode {
    Full,
    Quick,
}

#[derive(Serialize)]
struct DemoReport<'a> {
    outcomes: &'a [DemoOutcome],
    summary: &'a DemoSummary,
}

/// The full demo fails if any scenario fails; the quick demo always exits 0.
pub async fn run(agent: &Nl2SqlAgent, mode: DemoMode, json_output: bool) -> CommandResult {
    let runner = DemoRunner::new(agent);
    let outcomes = match mode {
        DemoMode::Full => runner.run_all().await,
        DemoMode::Quick => runner.run_quick().await,
    };
    let summary = DemoSummary::from_outcomes(&outcomes);

    let exit_code = match mode {
        DemoMode::Full if summary.failed > 0 => 1,
        _ => 0,
    };

    let output = if json_output {
        to_json("demo", &DemoReport { outcomes: &outcomes, summary: &summary })
    } else {
        render_human(mode, &outcomes, &summary)
    };
    CommandResult::new(exit_code, output)
}

fn render_human(mode: DemoMode, outcomes: &[DemoOutcome], summary: &DemoSummary) -> String {
    let mut lines = Vec::new();
    lines.push(match mode {
        DemoMode::Full => "Running demo scenarios".to_string(),
        DemoMode::Quick => "Running quick demo with core scenarios".to_string(),
    });

    for (index, outcome) in outcomes.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!(
            "[{}/{}] {}: {}",
            index + 1,
            outcomes.len(),
            outcome.scenario.category,
            outcome.scenario.question
        ));
        lines.push(render_result(&outcome.result));
        if outcome.succeeded() {
            lines.push(format!("Expected tables: {}", outcome.analysis.tables_check()));
            lines.push(format!("Expected operations: {}", outcome.analysis.operations_check()));
            if let Some(quality) = outcome.analysis.response_quality {
                lines.push(format!("Response quality: {quality:?}"));
            }
        }
    }

    lines.push(String::new());
    lines.push(render_summary(summary));
    lines.join("\n")
}

pub fn render_summary(summary: &DemoSummary) -> String {
    let mut lines = vec![
        "DEMO SUMMARY".to_string(),
        format!("Total queries: {}", summary.total),
        format!("Successful: {}", summary.succeeded),
        format!("Failed: {}", summary.failed),
        format!("Success rate: {:.1}%", summary.success_rate),
    ];

    if !summary.categories.is_empty() {
        lines.push("Category breakdown:".to_string());
        for stats in &summary.categories {
            lines.push(format!(
                "  {}: {}/{} ({:.1}%)",
                stats.category,
                stats.succeeded,
                stats.total,
                stats.success_rate()
            ));
        }
    }

    if !summary.failed_questions.is_empty() {
        lines.push("Failed queries:".to_string());
        for failed in &summary.failed_questions {
            lines.push(format!("  - '{}' - {}", failed.question, failed.error));
        }
    }

    if !summary.recommendations.is_empty() {
        lines.push("Recommendations:".to_string());
        lines.extend(summary.recommendations.iter().map(|line| format!("  - {line}")));
    }

    lines.push(format!("Generated at: {}", summary.generated_at.to_rfc3339()));
    lines.join("\n")
}
