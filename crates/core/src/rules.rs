//! Numbered business rules that every generated query is expected to follow.
//!
//! Rules are prose for the model and for humans; the few that can be checked
//! mechanically are checked by the guardrails in the agent crate.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BusinessRule {
    pub number: usize,
    pub title: String,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    rules: Vec<BusinessRule>,
}

impl RuleSet {
    /// Numbers the rules 1.. in the order given.
    pub fn new(rules: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(index, (title, text))| BusinessRule {
                number: index + 1,
                title: title.to_string(),
                text: text.to_string(),
            })
            .collect();
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BusinessRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `N. TITLE: text`, one rule per line.
    pub fn render(&self) -> String {
        self.rules
            .iter()
            .map(|rule| format!("{}. {}: {}", rule.number, rule.title, rule.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn business_rules() -> RuleSet {
    RuleSet::new([
        ("REVOLVE ORDERS", "Use site <> 'F' to exclude Forward brand orders"),
        (
            "PRODUCT ANALYSIS",
            "Use bi_report.shipmentnumber_rs (has product info), NOT bi_report.ordernumber_rs",
        ),
        ("PRODUCT JOINS", "Use UPPER(TRIM(p.code)) = productcode for product matching"),
        ("CATEGORY MAPPING", "Use SUBSTRING(SPLIT_PART(p.code, '-', 2), 2, 1) = cn.lettercat"),
        ("LOST PACKAGES", "Use extrastatus = 'lost package' (NOT 'lost')"),
        (
            "PAYMENT TOKENS",
            "paymenttokenservice is in mars__revolveclothing_com___db.orders",
        ),
        ("TOP PERCENTILES", "Use PERCENT_RANK() for percentage-based calculations"),
        ("SHIPPING CARRIERS", "Use mars__id.shipping_pickuptime for accurate carrier info"),
        ("RANDOM SAMPLING", "Use the RANDOM() function with ORDER BY"),
        ("DATE FILTERING", "Use proper TIMESTAMP comparisons with >= and < operators"),
    ])
}
