use std::future::Future;
use std::io::{BufRead, BufReader, Write};

use nl2sql_agent::runtime::Nl2SqlAgent;
use tokio::sync::mpsc;

use super::query::render_result;
use super::CommandResult;

const EXIT_WORDS: &[&str] = &["quit", "exit", "q"];

pub type LineReceiver = mpsc::Receiver<std::io::Result<String>>;

/// Reads questions from stdin until an exit word, end of input, or Ctrl-C.
pub async fn run(agent: &Nl2SqlAgent) -> CommandResult {
    let lines = spawn_line_reader(BufReader::new(std::io::stdin()));
    let interrupt = async {
        // A failed signal hookup behaves like no interrupt ever arriving.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let mut stdout = std::io::stdout();
    run_with(agent, lines, &mut stdout, interrupt).await
}

/// Feeds lines from `reader` into a channel from a detached OS thread.
///
/// A blocking read cannot be cancelled, so it must not live on the runtime's
/// blocking pool: shutting the runtime down would wait for the read to finish.
pub fn spawn_line_reader<R>(reader: R) -> LineReceiver
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if sender.blocking_send(line).is_err() || failed {
                break;
            }
        }
    });
    receiver
}

pub async fn run_with<W, I>(
    agent: &Nl2SqlAgent,
    mut lines: LineReceiver,
    out: &mut W,
    interrupt: I,
) -> CommandResult
where
    W: Write,
    I: Future<Output = ()>,
{
    tokio::pin!(interrupt);

    let _ = writeln!(out, "Entering interactive mode. Type 'quit' to exit.");
    let _ = writeln!(out, "Ask any question about the Revolve warehouse...");

    loop {
        let _ = write!(out, "\nYour question: ");
        let _ = out.flush();

        let line = tokio::select! {
            line = lines.recv() => line,
            () = &mut interrupt => {
                let _ = writeln!(out, "\nGoodbye!");
                break;
            }
        };

        let question = match line {
            Some(Ok(line)) => line.trim().to_string(),
            None => {
                let _ = writeln!(out, "\nGoodbye!");
                break;
            }
            Some(Err(error)) => {
                let _ = writeln!(out, "Unexpected error reading input: {error}");
                break;
            }
        };

        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            let _ = writeln!(out, "Goodbye!");
            break;
        }
        if question.is_empty() {
            continue;
        }

        let _ = writeln!(out, "Processing: {question}");
        let result = agent.process_question(&question, None).await;
        let _ = writeln!(out, "{}", render_result(&result));
    }

    CommandResult::new(0, String::new())
}
