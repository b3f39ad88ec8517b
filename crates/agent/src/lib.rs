//! Agent runtime for natural-language questions over the Redshift warehouse.
//!
//! This crate sits between a caller and an external LLM-agent runtime:
//! - Wraps the Integration Connector toolset the runtime executes SQL through (`tools`)
//! - Adds advisory pre-checks and answer compliance checks (`guardrails`)
//! - Drives the runtime through a pluggable [`llm::AgentRunner`] (`llm`)
//! - Exposes the [`runtime::Nl2SqlAgent`] facade and its setup validation (`runtime`)
//! - Runs canned demo scenarios and summarizes them (`harness`)
//!
//! # Principle
//!
//! The model writes and runs the SQL. Everything in this crate is deterministic
//! text handling around that call; none of it can block a question.

pub mod guardrails;
pub mod harness;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use harness::{demo_scenarios, DemoOutcome, DemoRunner, DemoScenario, DemoSummary};
pub use llm::{AgentRunner, ProcessAgentRunner};
pub use runtime::{AgentError, AgentSettings, Nl2SqlAgent, QuestionResult, ValidationReport};
pub use tools::{resolve_credentials, ConnectorToolset, CredentialSource, ToolsetError};
