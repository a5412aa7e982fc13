use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tracing_subscriber::EnvFilter;

mod classify;
mod cli;
mod config;
mod error;
mod fail_log;
mod process;
mod record;
mod repeat;
mod report;

use cli::RootArgs;
use fail_log::FailureLogWriter;
use repeat::{CommandExecutor, RepeatOptions, RepetitionController};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let config = config::load_config(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;
    for warning in &config.warnings {
        eprintln!("warning: {warning}");
    }
    let n_times = usize::try_from(args.n_times).context("--n_times does not fit in usize")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report::write_config_echo(&mut out, &config, n_times)?;

    let executor = CommandExecutor::new(&config.cmd, config.patterns.clone(), config.timeout)
        .context("prepare test command")?;
    let options = RepeatOptions {
        attempt_budget: n_times,
        failure_budget: config.n_failures,
    };
    let fail_log = FailureLogWriter::new(config.fail_log_file.clone(), config.n_failures);
    let mut controller = RepetitionController::new(executor, options, fail_log);
    let summary = controller.run(&mut out).context("run test command")?;
    tracing::info!(
        attempts_run = summary.attempts_run,
        failures_found = summary.failures_found,
        "repetition complete"
    );

    if args.json {
        report::write_json_summary(&mut out, &summary)?;
    }
    out.flush().context("flush stdout")?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
