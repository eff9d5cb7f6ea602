//! Sluice CLI: find random primes with a fan-out/fan-in pipeline.

use std::io::{ErrorKind, Write};
use std::ops::ControlFlow;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use sluice::{CliArgs, init_tracing, run_prime_finder};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match args.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        pipeline = %config.pipeline.name,
        workers = ?config.pipeline.workers,
        take = config.pipeline.take,
        "Loaded config"
    );

    let mut stdout = std::io::stdout().lock();
    let mut write_error = None;
    let result = run_prime_finder(&config, |prime| match writeln!(stdout, "{prime}") {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => {
            write_error = Some(e);
            ControlFlow::Break(())
        }
    })
    .await;

    if let Some(e) = write_error {
        if e.kind() == ErrorKind::BrokenPipe {
            warn!("Output closed, stopped early");
        } else {
            eprintln!("Failed to write output: {e}");
            return ExitCode::FAILURE;
        }
    }

    match result {
        Ok(report) => {
            for stage in &report.stages {
                info!(stage = %stage.name, state = %stage.state, "Stage finished");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
