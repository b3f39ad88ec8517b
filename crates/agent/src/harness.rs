//! Canned demo questions run end to end against the agent, with a light
//! analysis of each answer and an aggregate report.
//!
//! The analysis is informational. Whether a scenario "succeeded" only depends
//! on the agent returning an answer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::runtime::{Nl2SqlAgent, QuestionResult};

/// How many leading scenarios make up the quick demo.
pub const QUICK_DEMO_LEN: usize = 4;

/// Answers at or below this length are flagged as too short.
const ADEQUATE_RESPONSE_LEN: usize = 50;

const LOW_SUCCESS_RATE: f64 = 80.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DemoScenario {
    pub category: &'static str,
    pub question: &'static str,
    pub expected_tables: &'static [&'static str],
    pub expected_operations: &'static [&'static str],
    pub business_context: &'static str,
}

const SCENARIOS: &[DemoScenario] = &[
    DemoScenario {
        category: "Revolve Orders",
        question: "Show me the number of Revolve orders and AOV for United Kingdom in the last 12 months, split by category",
        expected_tables: &["shipmentnumber_rs", "product", "id_categorynames2"],
        expected_operations: &["JOIN", "COUNT", "AVG", "GROUP BY", "site <> 'F'"],
        business_context: "Primary demo query: order volume and AOV per category for one market",
    },
    DemoScenario {
        category: "High Value Customers",
        question: "Get top brands and categories by projected net sales for the top 5% high value customers",
        expected_tables: &["ordernumber_rs", "shipmentnumber_rs", "product"],
        expected_operations: &["PERCENT_RANK", "JOIN", "SUM", "ORDER BY", "LIMIT"],
        business_context: "Brand and category mix of the best customers",
    },
    DemoScenario {
        category: "Payment Analysis",
        question: "Show number of transactions and average monthly gross sales through ANET excluding ApplePay",
        expected_tables: &["ordernumber_rs", "orders"],
        expected_operations: &["JOIN", "COUNT", "AVG", "paymenttokenservice"],
        business_context: "Card processor volume without wallet payments",
    },
    DemoScenario {
        category: "Shipping Analysis",
        question: "Analyze Ontrac and UPS loss rates by order value with signature requirements",
        expected_tables: &["shipment", "shipping_pickuptime", "orders"],
        expected_operations: &["lost package", "CASE", "COUNT", "GROUP BY"],
        business_context: "Carrier loss rates by order value band",
    },
    DemoScenario {
        category: "Customer Sampling",
        question: "Get 5K random Revolve customers with their last transaction in the past 12 months",
        expected_tables: &["ordernumber_rs"],
        expected_operations: &["RANDOM()", "ROW_NUMBER", "LIMIT"],
        business_context: "Survey audience selection",
    },
    DemoScenario {
        category: "Brand Analysis",
        question: "What are the top 10 brands by net sales this year?",
        expected_tables: &["shipmentnumber_rs", "product"],
        expected_operations: &["JOIN", "SUM", "ORDER BY", "LIMIT"],
        business_context: "Brand performance ranking",
    },
    DemoScenario {
        category: "Category Analysis",
        question: "Compare average order value between categories for Revolve orders",
        expected_tables: &["shipmentnumber_rs", "id_categorynames2"],
        expected_operations: &["JOIN", "AVG", "GROUP BY"],
        business_context: "Category performance comparison",
    },
    DemoScenario {
        category: "Regional Analysis",
        question: "Which shipping countries had the highest gross sales last quarter?",
        expected_tables: &["ordernumber_rs"],
        expected_operations: &["SUM", "GROUP BY", "ORDER BY"],
        business_context: "Market comparison by destination country",
    },
    DemoScenario {
        category: "Sales Trends",
        question: "Show monthly net sales trends for the last 6 months",
        expected_tables: &["ordernumber_rs"],
        expected_operations: &["EXTRACT", "SUM", "GROUP BY", "ORDER BY"],
        business_context: "Time series of net sales",
    },
    DemoScenario {
        category: "Customer Behavior",
        question: "Find customers who ordered from both Revolve and Forward this year",
        expected_tables: &["ordernumber_rs"],
        expected_operations: &["DISTINCT", "WHERE", "site"],
        business_context: "Cross-site customer overlap",
    },
];

pub fn demo_scenarios() -> &'static [DemoScenario] {
    SCENARIOS
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseQuality {
    Adequate,
    TooShort,
}

/// Substring hits of the expected tables and operations in the answer text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultAnalysis {
    pub executed_successfully: bool,
    pub error_message: Option<String>,
    pub tables_found: usize,
    pub tables_expected: usize,
    pub operations_found: usize,
    pub operations_expected: usize,
    pub response_quality: Option<ResponseQuality>,
}

impl ResultAnalysis {
    pub fn analyze(scenario: &DemoScenario, result: &QuestionResult) -> Self {
        let mut analysis = Self {
            executed_successfully: result.success,
            error_message: result.error.clone(),
            tables_found: 0,
            tables_expected: scenario.expected_tables.len(),
            operations_found: 0,
            operations_expected: scenario.expected_operations.len(),
            response_quality: None,
        };

        if !result.success {
            return analysis;
        }

        let text = result.response.as_deref().unwrap_or_default().to_lowercase();
        analysis.tables_found = count_mentions(&text, scenario.expected_tables);
        analysis.operations_found = count_mentions(&text, scenario.expected_operations);
        analysis.response_quality = Some(if text.chars().count() > ADEQUATE_RESPONSE_LEN {
            ResponseQuality::Adequate
        } else {
            ResponseQuality::TooShort
        });
        analysis
    }

    pub fn tables_check(&self) -> String {
        if !self.executed_successfully {
            return "pending".to_string();
        }
        format!("{}/{} tables referenced", self.tables_found, self.tables_expected)
    }

    pub fn operations_check(&self) -> String {
        if !self.executed_successfully {
            return "pending".to_string();
        }
        format!("{}/{} operations detected", self.operations_found, self.operations_expected)
    }
}

fn count_mentions(text: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|needle| text.contains(&needle.to_lowercase())).count()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DemoOutcome {
    pub scenario: DemoScenario,
    pub result: QuestionResult,
    pub analysis: ResultAnalysis,
}

impl DemoOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.success
    }
}

pub struct DemoRunner<'a> {
    agent: &'a Nl2SqlAgent,
    scenarios: &'a [DemoScenario],
}

impl<'a> DemoRunner<'a> {
    pub fn new(agent: &'a Nl2SqlAgent) -> Self {
        Self { agent, scenarios: demo_scenarios() }
    }

    pub fn with_scenarios(agent: &'a Nl2SqlAgent, scenarios: &'a [DemoScenario]) -> Self {
        Self { agent, scenarios }
    }

    pub fn scenarios(&self) -> &[DemoScenario] {
        self.scenarios
    }

    pub async fn run_single(&self, scenario: &DemoScenario) -> DemoOutcome {
        let result = self.agent.process_question(scenario.question, None).await;
        let analysis = ResultAnalysis::analyze(scenario, &result);
        info!(
            event_name = "demo.scenario.finished",
            correlation_id = %result.correlation_id,
            category = scenario.category,
            success = result.success,
            "demo scenario finished"
        );
        DemoOutcome { scenario: scenario.clone(), result, analysis }
    }

    pub async fn run_all(&self) -> Vec<DemoOutcome> {
        self.run_scenarios(self.scenarios).await
    }

    pub async fn run_quick(&self) -> Vec<DemoOutcome> {
        let quick = &self.scenarios[..QUICK_DEMO_LEN.min(self.scenarios.len())];
        self.run_scenarios(quick).await
    }

    async fn run_scenarios(&self, scenarios: &[DemoScenario]) -> Vec<DemoOutcome> {
        let mut outcomes = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            outcomes.push(self.run_single(scenario).await);
        }
        outcomes
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: usize,
    pub succeeded: usize,
}

impl CategoryStats {
    pub fn success_rate(&self) -> f64 {
        percentage(self.succeeded, self.total)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedQuestion {
    pub question: String,
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DemoSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    /// Categories in the order they first appear.
    pub categories: Vec<CategoryStats>,
    pub failed_questions: Vec<FailedQuestion>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl DemoSummary {
    pub fn from_outcomes(outcomes: &[DemoOutcome]) -> Self {
        let total = outcomes.len();
        let succeeded = outcomes.iter().filter(|outcome| outcome.succeeded()).count();
        let failed = total - succeeded;
        let success_rate = percentage(succeeded, total);

        let mut categories: Vec<CategoryStats> = Vec::new();
        for outcome in outcomes {
            let category = outcome.scenario.category;
            let index = match categories.iter().position(|stats| stats.category == category) {
                Some(index) => index,
                None => {
                    categories.push(CategoryStats {
                        category: category.to_string(),
                        total: 0,
                        succeeded: 0,
                    });
                    categories.len() - 1
                }
            };
            categories[index].total += 1;
            if outcome.succeeded() {
                categories[index].succeeded += 1;
            }
        }

        let failed_questions = outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded())
            .map(|outcome| FailedQuestion {
                question: outcome.scenario.question.to_string(),
                error: outcome.result.error.clone().unwrap_or_else(|| "Unknown error".to_string()),
            })
            .collect::<Vec<_>>();

        let mut recommendations = Vec::new();
        if success_rate < LOW_SUCCESS_RATE {
            recommendations.push(
                "Success rate below 80% - review agent configuration and prompts".to_string(),
            );
        }
        if failed > 0 {
            recommendations
                .push("Some queries failed - check Integration Connector connectivity".to_string());
        }

        Self {
            total,
            succeeded,
            failed,
            success_rate,
            categories,
            failed_questions,
            recommendations,
            generated_at: Utc::now(),
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::{
        demo_scenarios, DemoRunner, DemoScenario, DemoSummary, ResponseQuality, ResultAnalysis,
        QUICK_DEMO_LEN,
    };
    use crate::llm::AgentRunner;
    use crate::runtime::{AgentSettings, Nl2SqlAgent, QuestionResult};

    /// Answers with canned SQL unless the question mentions "Forward".
    struct ScriptedRunner;

    #[async_trait]
    impl AgentRunner for ScriptedRunner {
        async fn run(&self, question: &str) -> Result<String> {
            if question.contains("Forward") {
                bail!("connection reset by peer");
            }
            Ok("SELECT COUNT(*) FROM bi_report.ordernumber_rs o JOIN mars__revolveclothing_com___db.orders r \
                ON o.transactionid = r.transactionid WHERE o.site <> 'F' GROUP BY 1"
                .to_string())
        }
    }

    fn agent() -> Nl2SqlAgent {
        Nl2SqlAgent::new(
            AgentSettings {
                project_id: "demo-project".to_string(),
                location: "us-central1".to_string(),
                connection: "redshift-demo-connection".to_string(),
                model: "gemini-2.0-flash".to_string(),
                service_account_path: PathBuf::from("missing.json"),
            },
            ScriptedRunner,
        )
        .expect("agent")
    }

    fn result(success: bool, response: Option<&str>) -> QuestionResult {
        QuestionResult {
            success,
            question: "q".to_string(),
            response: response.map(str::to_string),
            error: (!success).then(|| "boom".to_string()),
            suggestions: Vec::new(),
            violations: Vec::new(),
            compliant: true,
            troubleshooting: Vec::new(),
            context: None,
            correlation_id: "test".to_string(),
        }
    }

    #[test]
    fn scenarios_have_unique_questions_and_expectations() {
        let scenarios = demo_scenarios();
        assert!(scenarios.len() >= QUICK_DEMO_LEN);
        for (index, scenario) in scenarios.iter().enumerate() {
            assert!(!scenario.expected_tables.is_empty(), "{}", scenario.question);
            assert!(!scenario.expected_operations.is_empty(), "{}", scenario.question);
            assert!(scenarios[index + 1..].iter().all(|other| other.question != scenario.question));
        }
    }

    #[test]
    fn analysis_counts_table_and_operation_mentions() {
        let scenario = &demo_scenarios()[2];
        let answer = "SELECT COUNT(*), AVG(o.ssales) FROM bi_report.ordernumber_rs o \
                      JOIN mars__revolveclothing_com___db.orders r ON o.transactionid = r.transactionid";
        let analysis = ResultAnalysis::analyze(scenario, &result(true, Some(answer)));

        assert_eq!(analysis.tables_check(), "2/2 tables referenced");
        assert_eq!(analysis.operations_check(), "3/4 operations detected");
        assert_eq!(analysis.response_quality, Some(ResponseQuality::Adequate));
    }

    #[test]
    fn short_or_failed_answers_are_flagged() {
        let scenario = &demo_scenarios()[0];
        let short = ResultAnalysis::analyze(scenario, &result(true, Some("42")));
        assert_eq!(short.response_quality, Some(ResponseQuality::TooShort));

        let failed = ResultAnalysis::analyze(scenario, &result(false, None));
        assert_eq!(failed.tables_check(), "pending");
        assert_eq!(failed.response_quality, None);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn quick_demo_runs_the_first_four_scenarios() {
        let agent = agent();
        let runner = DemoRunner::new(&agent);
        let outcomes = runner.run_quick().await;

        assert_eq!(outcomes.len(), QUICK_DEMO_LEN);
        let questions =
            outcomes.iter().map(|outcome| outcome.scenario.question).collect::<Vec<_>>();
        let expected = demo_scenarios()[..QUICK_DEMO_LEN]
            .iter()
            .map(|scenario| scenario.question)
            .collect::<Vec<_>>();
        assert_eq!(questions, expected);
        assert!(outcomes.iter().all(|outcome| outcome.succeeded()));
    }

    #[tokio::test]
    async fn full_demo_summary_reports_failures_and_recommendations() {
        let agent = agent();
        let outcomes = DemoRunner::new(&agent).run_all().await;
        let summary = DemoSummary::from_outcomes(&outcomes);

        assert_eq!(summary.total, demo_scenarios().len());
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded + summary.failed, summary.total);
        assert_eq!(summary.failed_questions.len(), 1);
        assert!(summary.failed_questions[0].error.contains("connection reset"));
        assert_eq!(
            summary.recommendations,
            vec!["Some queries failed - check Integration Connector connectivity".to_string()]
        );
        assert_eq!(summary.categories[0].category, "Revolve Orders");
    }

    #[tokio::test]
    async fn category_breakdown_keeps_first_seen_order() {
        const SCENARIOS: &[DemoScenario] = &[
            DemoScenario {
                category: "B",
                question: "Forward first",
                expected_tables: &["orders"],
                expected_operations: &["JOIN"],
                business_context: "",
            },
            DemoScenario {
                category: "A",
                question: "second",
                expected_tables: &["orders"],
                expected_operations: &["JOIN"],
                business_context: "",
            },
            DemoScenario {
                category: "B",
                question: "third",
                expected_tables: &["orders"],
                expected_operations: &["JOIN"],
                business_context: "",
            },
        ];

        let agent = agent();
        let outcomes = DemoRunner::with_scenarios(&agent, SCENARIOS).run_all().await;
        let summary = DemoSummary::from_outcomes(&outcomes);

        let categories = summary
            .categories
            .iter()
            .map(|stats| (stats.category.as_str(), stats.total, stats.succeeded))
            .collect::<Vec<_>>();
        assert_eq!(categories, vec![("B", 2, 1), ("A", 1, 1)]);
        assert!((summary.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.recommendations.len(), 2);
    }

    #[test]
    fn empty_summary_has_zero_rate() {
        let summary = DemoSummary::from_outcomes(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert!(summary.failed_questions.is_empty());
    }
}
