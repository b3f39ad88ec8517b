use std::process::ExitCode;

fn main() -> ExitCode {
    nl2sql_cli::run()
}
