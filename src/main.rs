//! twinprobe command-line entry point.

use std::process::ExitCode;

use clap::Parser;
use twinprobe::cli::{Cli, Verdict, execute, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(verdict) => ExitCode::from(verdict.code()),
        Err(e) => {
            tracing::error!(error = %e, "setup failed");
            eprintln!("error: {e:#}");
            ExitCode::from(Verdict::SETUP_ERROR)
        }
    }
}
