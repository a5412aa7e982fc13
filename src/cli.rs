//! CLI argument parsing.
//!
//! There are no subcommands: one invocation repeats one configured test.
use crate::config::DEFAULT_CONFIG_PATH;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rtest",
    version,
    about = "Repeat a test command and classify each run from its output",
    after_help = "Config (TOML):\n  [test]\n  cmd = \"./run_test.sh\"\n  result_pattern = \"RESULT:\"\n  ok_pattern = \"PASS\"\n  fail_log_file = \"fail.log\"   # optional\n  n_failures = 1               # optional\n  timeout_seconds = 60         # optional\n\n  [parse]                      # optional\n  latency = 'latency=(?P<latency_ms>\\d+)ms'\n\nExamples:\n  rtest --config repeat_test.toml --n_times 100\n  rtest -n 20 --json"
)]
pub struct RootArgs {
    /// Config file with a [test] section and optional [parse] section
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Total number of runs to attempt
    #[arg(
        short = 'n',
        long = "n_times",
        visible_alias = "n-times",
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub n_times: u64,

    /// Print a JSON summary of all runs after the last one
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging on stderr (RUST_LOG overrides)
    #[arg(long)]
    pub verbose: bool,
}
