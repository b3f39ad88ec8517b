use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::tools::CREDENTIALS_ENV;

/// The external LLM-agent runtime: takes a question, returns the agent's answer text.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, question: &str) -> Result<String>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Static part of every bridge request.
#[derive(Clone, Debug, Serialize)]
pub struct BridgeSession {
    pub agent_name: String,
    pub model: String,
    pub project_id: String,
    pub location: String,
    pub instructions: String,
    pub toolset: Value,
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    #[serde(flatten)]
    session: &'a BridgeSession,
    question: &'a str,
}

/// Runs the agent in a child process speaking one JSON request on stdin and
/// answering with plain text on stdout.
#[derive(Clone, Debug)]
pub struct ProcessAgentRunner {
    command: Vec<String>,
    credential_file: Option<std::path::PathBuf>,
    session: BridgeSession,
}

impl ProcessAgentRunner {
    pub fn new(
        command: Vec<String>,
        credential_file: Option<std::path::PathBuf>,
        session: BridgeSession,
    ) -> Self {
        Self { command, credential_file, session }
    }

    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    pub fn session(&self) -> &BridgeSession {
        &self.session
    }

    fn request_body(&self, question: &str) -> Result<Vec<u8>> {
        let mut body = serde_json::to_vec(&BridgeRequest { session: &self.session, question })
            .context("failed to encode agent bridge request")?;
        body.push(b'\n');
        Ok(body)
    }
}

#[async_trait]
impl AgentRunner for ProcessAgentRunner {
    async fn run(&self, question: &str) -> Result<String> {
        let (program, args) =
            self.command.split_first().ok_or_else(|| anyhow!("agent command is empty"))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = &self.credential_file {
            command.env(CREDENTIALS_ENV, path);
        }

        debug!(event_name = "agent.bridge.spawn", program = %program, "starting agent bridge");
        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start agent bridge `{program}`"))?;

        let body = self.request_body(question)?;
        let mut stdin =
            child.stdin.take().ok_or_else(|| anyhow!("agent bridge stdin was not captured"))?;
        // A bridge that exits early breaks the pipe; its stderr still explains why.
        let sent = stdin.write_all(&body).await;
        drop(stdin);

        let output = child.wait_with_output().await.context("agent bridge did not finish")?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            bail!("agent bridge exited with {}: {}", output.status, stderr_or_placeholder(&stderr));
        }
        if let Err(error) = sent {
            bail!(
                "failed to send question to agent bridge ({error}): {}",
                stderr_or_placeholder(&stderr)
            );
        }
        if stdout.is_empty() {
            bail!("agent bridge returned an empty response: {}", stderr_or_placeholder(&stderr));
        }

        Ok(stdout)
    }

    fn is_available(&self) -> bool {
        self.program().map(|program| !program.trim().is_empty()).unwrap_or(false)
    }
}

fn stderr_or_placeholder(stderr: &str) -> &str {
    if stderr.is_empty() {
        "no error output"
    } else {
        stderr
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AgentRunner, BridgeSession, ProcessAgentRunner};

    fn session() -> BridgeSession {
        BridgeSession {
            agent_name: "nl2sql_redshift_agent".to_string(),
            model: "gemini-2.0-flash".to_string(),
            project_id: "demo-project".to_string(),
            location: "us-central1".to_string(),
            instructions: "be precise".to_string(),
            toolset: json!({"connection": "redshift-demo-connection"}),
        }
    }

    fn shell(script: &str) -> ProcessAgentRunner {
        ProcessAgentRunner::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            None,
            session(),
        )
    }

    #[test]
    fn request_is_a_single_json_line_with_the_question() {
        let runner = shell("cat");
        let body = runner.request_body("How many orders?").expect("body");
        assert_eq!(body.last(), Some(&b'\n'));

        let value: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value["question"], "How many orders?");
        assert_eq!(value["agent_name"], "nl2sql_redshift_agent");
        assert_eq!(value["toolset"]["connection"], "redshift-demo-connection");
    }

    #[tokio::test]
    async fn returns_trimmed_stdout() {
        let runner = shell("cat > /dev/null; printf '  42 orders\\n\\n'");
        let answer = runner.run("How many orders?").await.expect("bridge should answer");
        assert_eq!(answer, "42 orders");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let runner = shell("cat > /dev/null; echo 'permission denied on connector' >&2; exit 3");
        let error = runner.run("q").await.expect_err("bridge failure should surface");
        assert!(error.to_string().contains("permission denied on connector"));
    }

    #[tokio::test]
    async fn bridge_that_exits_before_reading_still_reports_stderr() {
        let runner =
            shell("exec 0<&-; echo 'authentication failed for service account' >&2; exit 1");
        let question = "x".repeat(1 << 20);
        let error = runner.run(&question).await.expect_err("early exit should surface");
        assert!(error.to_string().contains("authentication failed for service account"));
    }

    #[tokio::test]
    async fn empty_output_is_an_error() {
        let runner = shell("cat > /dev/null");
        let error = runner.run("q").await.expect_err("empty answer should fail");
        assert!(error.to_string().contains("empty response"));
    }

    #[test]
    fn empty_command_is_unavailable() {
        let runner = ProcessAgentRunner::new(Vec::new(), None, session());
        assert!(!runner.is_available());
        assert!(shell("true").is_available());
    }
}
