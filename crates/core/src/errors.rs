use serde::Serialize;

/// Coarse bucket for a failed question, picked from the error text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Authentication,
    Connectivity,
    Schema,
    Unknown,
}

impl FailureCategory {
    /// Case-insensitive keyword match; the first category that matches wins.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let mentions = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

        if mentions(&["authentication", "permission"]) {
            Self::Authentication
        } else if mentions(&["connection", "network"]) {
            Self::Connectivity
        } else if mentions(&["table", "column"]) {
            Self::Schema
        } else {
            Self::Unknown
        }
    }

    pub fn suggestions(self) -> Vec<String> {
        let lines: &[&str] = match self {
            Self::Authentication => &[
                "Check that the service account file exists and is readable",
                "Verify the service account has Integration Connectors and Vertex AI permissions",
            ],
            Self::Connectivity => &[
                "Check network connectivity to Google Cloud",
                "Verify the Integration Connector for Redshift is active",
            ],
            Self::Schema => &[
                "Verify the table and column names exist in the warehouse",
                "Try rephrasing the question with explicit table names",
            ],
            Self::Unknown => &["Check the logs for more details"],
        };
        lines.iter().map(|line| line.to_string()).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Connectivity => "connectivity",
            Self::Schema => "schema",
            Self::Unknown => "unknown",
        }
    }
}
