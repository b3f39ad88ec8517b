pub mod catalog;
pub mod config;
pub mod errors;
pub mod prompt;
pub mod rules;
pub mod samples;
pub mod sql_check;

pub use catalog::{schema, Column, Relationship, RelationshipIssue, Schema, Table};
pub use config::{AgentConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::FailureCategory;
pub use prompt::{
    build_agent_instructions, build_response_explanation_prompt, build_sql_generation_prompt,
    build_validation_prompt, format_relationships, format_samples, format_schema_description,
    select_relevant_samples,
};
pub use rules::{business_rules, BusinessRule, RuleSet};
pub use samples::{sample_library, SampleLibrary, SampleQuery};
pub use sql_check::{extract_table_names, validate_sql_syntax, SqlSyntaxCheck, SqlSyntaxError};
