//! Advisory checks around a question and the agent's answer.
//!
//! Nothing here blocks processing. Pre-validation produces hints that are
//! attached to the result; compliance flags answers that visibly ignore a
//! business rule.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PreValidation {
    /// Always true; kept so callers can treat this like the other check outputs.
    pub valid: bool,
    pub suggestions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Compliance {
    pub compliant: bool,
    pub violations: Vec<String>,
}

struct QuestionHint {
    applies: fn(&str) -> bool,
    suggestion: &'static str,
}

fn mentions_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

const QUESTION_HINTS: &[QuestionHint] = &[
    QuestionHint {
        applies: |q: &str| q.contains("revolve") && !q.contains("site"),
        suggestion: "Revolve orders need the site filter: add site <> 'F' to exclude Forward orders",
    },
    QuestionHint {
        applies: |q: &str| {
            mentions_any(q, &["product", "brand", "category"]) && !q.contains("shipment")
        },
        suggestion: "Product-level analysis should use bi_report.shipmentnumber_rs, not bi_report.ordernumber_rs",
    },
    QuestionHint {
        applies: |q: &str| mentions_any(q, &["payment", "applepay", "token"]),
        suggestion: "Payment token details require a join to mars__revolveclothing_com___db.orders for paymenttokenservice",
    },
    QuestionHint {
        applies: |q: &str| mentions_any(q, &["lost", "package"]),
        suggestion: "Lost shipments are marked with extrastatus = 'lost package', not 'lost'",
    },
    QuestionHint {
        applies: |q: &str| q.contains("top") && mentions_any(q, &["%", "percent"]),
        suggestion: "Use PERCENT_RANK() for top-percentage calculations",
    },
    QuestionHint {
        applies: |q: &str| mentions_any(q, &["carrier", "ontrac", "ups"]),
        suggestion: "Use mars__id.shipping_pickuptime for accurate carrier information",
    },
    QuestionHint {
        applies: |q: &str| q.contains("random"),
        suggestion: "Use ORDER BY RANDOM() for random sampling",
    },
];

pub fn pre_validate_question(question: &str) -> PreValidation {
    let lowered = question.to_lowercase();
    let suggestions = QUESTION_HINTS
        .iter()
        .filter(|hint| (hint.applies)(&lowered))
        .map(|hint| hint.suggestion.to_string())
        .collect();

    PreValidation { valid: true, suggestions }
}

pub const SITE_FILTER_VIOLATION: &str =
    "Revolve orders should exclude Forward with site <> 'F'";
pub const LOST_PACKAGE_VIOLATION: &str =
    "Lost packages should be matched with 'lost package', not 'lost'";

pub fn check_business_rule_compliance(question: &str, response: &str) -> Compliance {
    let question = question.to_lowercase();
    let response = response.to_lowercase();
    let mut violations = Vec::new();

    if question.contains("revolve")
        && response.contains("site")
        && !response.contains("site <> 'f'")
        && !response.contains("site != 'f'")
    {
        violations.push(SITE_FILTER_VIOLATION.to_string());
    }

    if mentions_any(&question, &["lost", "package"])
        && response.contains("'lost'")
        && !response.contains("'lost package'")
    {
        violations.push(LOST_PACKAGE_VIOLATION.to_string());
    }

    Compliance { compliant: violations.is_empty(), violations }
}
