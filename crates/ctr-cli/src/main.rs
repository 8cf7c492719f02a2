use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use ctr_sweep::{RunCache, DEFAULT_CACHE_ROOT};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{
    clean::{self, CleanArgs},
    run::{self, RunArgs},
    status::{self, StatusArgs},
};

mod commands;
mod runner;

#[derive(Parser, Debug)]
#[command(name = "ctr", version, about = "Cluster test runner")]
struct Cli {
    /// Logging verbosity; `RUST_LOG` takes precedence when set.
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value_t = LogLevel::Info,
        global = true
    )]
    log_level: LogLevel,
    /// Print lots of debugging statements, including full error detail.
    #[arg(short, long, global = true)]
    debug: bool,
    /// Directory holding per-run status sentinels.
    #[arg(long, env = "CTR_CACHE_ROOT", default_value = DEFAULT_CACHE_ROOT, global = true)]
    cache_root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute every run of a binder, stopping at the first failure.
    Run(RunArgs),
    /// Render the run sequence with each entry's cache state.
    Status(StatusArgs),
    /// Delete the run cache.
    Clean(CleanArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    #[value(name = "INFO", alias = "info")]
    Info,
    #[value(name = "WARN", alias = "warn")]
    Warn,
    #[value(name = "ERROR", alias = "error")]
    Error,
    #[value(name = "DEBUG", alias = "debug")]
    Debug,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
        }
    }
}

fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug || cli.log_level == LogLevel::Debug;
    init_logging(if debug { LogLevel::Debug } else { cli.log_level });

    let cache = RunCache::new(&cli.cache_root);
    let result = match &cli.command {
        Command::Run(args) => run::run(args, &cache),
        Command::Status(args) => status::run(args, &cache),
        Command::Clean(args) => clean::run(args, &cache),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if debug {
                tracing::error!("{err:?}");
            } else {
                tracing::error!("{err}");
            }
            ExitCode::from(process_exit_code(err.exit_code()))
        }
    }
}

/// Narrows a runner exit code to a process status. Codes outside `0..=255`
/// become `1`.
fn process_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or_else(|_| {
        tracing::warn!(exit_code = code, "exit code out of range, exiting with 1");
        1
    })
}
