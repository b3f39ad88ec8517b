//! Prompt assembly for SQL generation, SQL review and answer narration.
//!
//! Every function here is a pure rendering of catalog data: same input, same
//! bytes out. No clocks, no hashing order.

use crate::catalog::{Column, Relationship, Schema, Table, WAREHOUSE_TYPES};
use crate::rules::RuleSet;
use crate::samples::{SampleLibrary, SampleQuery};

const NO_CONTEXT: &str = "No additional context provided";

/// A topic bucket: any trigger in the question selects the bucket, then samples
/// whose own question contains `topic` are used.
struct SampleBucket {
    triggers: &'static [&'static str],
    topic: &'static str,
}

/// Evaluated top to bottom; only the first bucket that fires is consulted.
const SAMPLE_BUCKETS: &[SampleBucket] = &[
    SampleBucket { triggers: &["aov", "average order", "order value"], topic: "aov" },
    SampleBucket { triggers: &["high value", "top customer", "percentile"], topic: "high value" },
    SampleBucket { triggers: &["payment", "anet", "applepay"], topic: "anet" },
    SampleBucket { triggers: &["loss", "shipping", "carrier", "ups", "ontrac"], topic: "loss" },
    SampleBucket { triggers: &["random", "sample", "survey"], topic: "random" },
    SampleBucket { triggers: &["brand"], topic: "brand" },
    SampleBucket { triggers: &["category"], topic: "category" },
];

const FALLBACK_SAMPLE_COUNT: usize = 2;

pub fn format_schema_description(schema: &Schema) -> String {
    schema.tables.iter().map(format_table).collect::<Vec<_>>().join("\n\n")
}

fn format_table(table: &Table) -> String {
    let mut lines =
        vec![format!("Table: {}", table.name), format!("Description: {}", table.description)];

    if !table.business_rules.is_empty() {
        lines.push("Business Rules:".to_string());
        lines.extend(table.business_rules.iter().map(|rule| format!("  * {rule}")));
    }

    lines.push("Columns:".to_string());
    lines.extend(table.columns.iter().map(|column| format!("  - {}", format_column(column))));
    lines.join("\n")
}

fn format_column(column: &Column) -> String {
    let mut line = format!("{} ({})", column.name, column.data_type);
    if column.primary_key {
        line.push_str(" [PRIMARY KEY]");
    } else if let Some(target) = &column.foreign_key {
        line.push_str(&format!(" [FOREIGN KEY -> {target}]"));
    }
    if !column.description.is_empty() {
        line.push_str(&format!(" - {}", column.description));
    }
    line
}

pub fn format_relationships(relationships: &[Relationship]) -> String {
    relationships
        .iter()
        .map(|relationship| {
            format!(
                "- {}: {} ({})",
                relationship.name, relationship.condition, relationship.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Picks few-shot samples for a question by keyword bucket.
///
/// A question that mentions several topics (say "brand" and "category") only
/// ever consults the first bucket in [`SAMPLE_BUCKETS`] order. With no bucket
/// hit, or a bucket that collects nothing, the first two samples are used.
pub fn select_relevant_samples<'a>(
    question: &str,
    library: &'a SampleLibrary,
) -> Vec<&'a SampleQuery> {
    let question = question.to_lowercase();

    let selected = SAMPLE_BUCKETS
        .iter()
        .find(|bucket| bucket.triggers.iter().any(|trigger| question.contains(trigger)))
        .map(|bucket| {
            library
                .iter()
                .filter(|sample| sample.question.to_lowercase().contains(bucket.topic))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if selected.is_empty() {
        return library.iter().take(FALLBACK_SAMPLE_COUNT).collect();
    }
    selected
}

pub fn format_samples(samples: &[&SampleQuery]) -> String {
    samples
        .iter()
        .map(|sample| {
            format!(
                "Question: {}\nSQL: {}\nExplanation: {}",
                sample.question,
                sample.sql.trim(),
                sample.explanation
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_sql_generation_prompt(
    question: &str,
    schema: &Schema,
    rules: &RuleSet,
    library: &SampleLibrary,
    extra_context: Option<&str>,
) -> String {
    let samples = select_relevant_samples(question, library);
    let context =
        extra_context.map(str::trim).filter(|context| !context.is_empty()).unwrap_or(NO_CONTEXT);

    format!(
        "
You are a Redshift SQL expert. Your task is to write a Redshift SQL query that answers the following question.

<Guidelines>
- Join only necessary tables to answer the question
- When joining tables ensure all join columns are the same data type
- Use proper Redshift syntax and data types: {types}
- Don't include any comments in the SQL code
- Generate clean SQL without ```sql or ``` markers
- Use fully qualified table names: schema.table_name
- For aggregations, include all non-aggregated columns in GROUP BY
- Handle date comparisons appropriately for Redshift

<Business Rules>
{rules}

<Database Schema>
{schema}

<Table Relationships>
{relationships}

<Sample Queries for Reference>
{samples}

<Additional Context>
{context}

<User Question>
{question}

Generate a syntactically and semantically correct Redshift SQL query:
",
        types = WAREHOUSE_TYPES.join(", "),
        rules = rules.render(),
        schema = format_schema_description(schema),
        relationships = format_relationships(&schema.relationships),
        samples = format_samples(&samples),
    )
}

pub fn build_validation_prompt(question: &str, schema: &Schema, candidate_sql: &str) -> String {
    format!(
        r#"
You are a Redshift SQL validator. Analyze the following SQL query and determine if it's valid.

<Validation Guidelines>
- Check syntax correctness for Redshift
- Verify table and column names exist in the schema
- Ensure JOIN conditions are proper
- Check data type compatibility
- Validate aggregate functions usage
- Ensure GROUP BY includes all non-aggregated SELECT columns

<Database Schema>
{schema}

<User Question>
{question}

<Generated SQL>
{candidate_sql}

Respond with a JSON object:
{{
    "valid": true/false,
    "errors": "description of any errors found (empty string if valid)",
    "suggestions": "suggestions for improvement (optional)"
}}
"#,
        schema = format_schema_description(schema),
    )
}

pub fn build_response_explanation_prompt(question: &str, raw_result: &str) -> String {
    format!(
        "
You are a data analyst assistant. Generate a clear, informative natural language response based on the SQL query results.

<Guidelines>
- Provide insights and key findings from the data
- Use business-friendly language
- Include specific numbers and metrics where relevant
- If the result is empty or null, explain what this means
- Structure the response in a conversational manner

<User Question>
{question}

<SQL Results>
{raw_result}

Generate a helpful natural language response:
"
    )
}

/// System instructions handed to the agent runtime together with the connector tools.
pub fn build_agent_instructions(schema: &Schema, rules: &RuleSet) -> String {
    format!(
        "
You are an expert SQL analyst specializing in retail data analysis on AWS Redshift databases.

Your primary task is to:
1. Convert natural language questions to correct Redshift SQL queries
2. Execute queries using the Integration Connector tools
3. Provide clear, insightful responses based on the results

<Database Schema>
{schema}

<Table Relationships>
{relationships}

<Critical Business Rules>
{rules}

<Key Guidelines>
- Always use fully qualified table names (schema.table_name)
- Use proper Redshift SQL syntax and data types
- Join only necessary tables to answer the question
- For date queries, assume \"last quarter\" means last 3 months from today
- When showing \"top N\" results, always include ORDER BY and LIMIT
- For aggregations, include all non-aggregated columns in GROUP BY
- Provide both the SQL query and natural language explanation of results
- If a query fails, analyze the error and suggest corrections

<Available Tools>
- redshift_list_[table]: List records from specific tables
- redshift_get_[table]: Get specific records with filters
- redshift_execute_custom_query: Execute custom SQL queries (use this for complex analytical queries)

<Response Format>
When answering questions:
1. First, analyze what data is needed
2. Generate and explain the SQL query
3. Execute the query using appropriate tools
4. Interpret and explain the results in business terms
5. Provide insights and recommendations when relevant

<Sample Query Patterns>
- Count queries: SELECT COUNT(*) FROM table WHERE conditions
- Top N queries: SELECT columns FROM table ORDER BY metric DESC LIMIT N
- Aggregation: SELECT group_col, SUM(metric) FROM table GROUP BY group_col
- Joins: SELECT cols FROM table1 t1 JOIN table2 t2 ON t1.id = t2.id

Always double-check your SQL syntax before execution and provide helpful explanations of what the query does and what the results mean.
",
        schema = format_schema_description(schema),
        relationships = format_relationships(&schema.relationships),
        rules = rules.render(),
    )
}
