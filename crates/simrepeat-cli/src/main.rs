//! Runs the simulation platform's test runner a fixed number of times.
//!
//! # Usage
//!
//! ```bash
//! # Run behave three times with a config and a model file
//! simrepeat 3 sim.cfg.json pickplace.model.json
//!
//! # Run without forwarding any files
//! simrepeat 10
//!
//! # Forward extra arguments to behave
//! simrepeat 5 sim.cfg.json model.json -- --no-capture
//!
//! # Point at a non-default install and keep a JSON report
//! simrepeat --platform-dir /opt/isaac-sim --report run.json 3
//! ```
//!
//! The remaining count is printed to stdout after every run. Logs go to stderr
//! (`RUST_LOG`, or `-v`/`-vv`).

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use simrepeat_core::config::SimrepeatConfig;
use simrepeat_core::platform::PlatformInstall;
use simrepeat_core::report::ReportError;
use simrepeat_core::runner::{ProcessLauncher, RepeatRunner, RunnerError};

/// Run the simulation test runner a fixed number of times.
#[derive(Parser)]
#[command(name = "simrepeat", version)]
struct Cli {
    /// Number of times to run the test runner
    count: u64,

    /// Configuration file forwarded to the test runner
    config: Option<PathBuf>,

    /// Model file forwarded to the test runner
    model: Option<PathBuf>,

    /// Extra arguments forwarded after the files
    #[arg(last = true)]
    passthrough: Vec<OsString>,

    /// Root of the simulation platform installation
    #[arg(long, env = "SIMREPEAT_PLATFORM_DIR")]
    platform_dir: Option<PathBuf>,

    /// Write a JSON report of every run to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Arguments forwarded on every invocation, in order.
    fn forwarded_args(&self) -> Vec<OsString> {
        self.config
            .iter()
            .chain(self.model.iter())
            .map(|p| p.clone().into_os_string())
            .chain(self.passthrough.iter().cloned())
            .collect()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum CliError {
    Run(RunnerError),
    Report(ReportError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Run(e) => write!(f, "{}", e),
            CliError::Report(e) => write!(f, "Failed to write report: {}", e),
        }
    }
}

/// Runs the loop and returns the exit code of the last invocation.
fn run(cli: Cli) -> Result<i32, CliError> {
    let config = SimrepeatConfig::load();
    let platform = PlatformInstall::from_config(&config, cli.platform_dir.clone());
    let args = cli.forwarded_args();

    if cli.count > 0 {
        preflight(&cli, &platform);
    }

    let mut runner = RepeatRunner::new(ProcessLauncher::new(platform), args);
    let report = runner
        .run(cli.count, &mut io::stdout().lock())
        .map_err(CliError::Run)?;

    if let Some(path) = &cli.report {
        report.save(path).map_err(CliError::Report)?;
    }

    Ok(report.exit_code())
}

/// Warns about things that will make every invocation fail. Never aborts.
fn preflight(cli: &Cli, platform: &PlatformInstall) {
    if !platform.is_installed() {
        warn!(
            interpreter = %platform.interpreter_path().display(),
            config = %SimrepeatConfig::path().display(),
            "Simulation platform interpreter not found; set --platform-dir, \
             SIMREPEAT_PLATFORM_DIR or platform_dir in the config file"
        );
    }
    for path in cli.config.iter().chain(cli.model.iter()) {
        if !path.exists() {
            warn!(path = %path.display(), "Forwarded file does not exist");
        }
    }
}

/// Maps a shell-style exit code onto the process exit status.
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(exit_byte(code))
}

/// Low byte of the exit code, as a shell reports it.
fn exit_byte(code: i32) -> u8 {
    (code & 0xff) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("simrepeat").chain(args.iter().copied()))
            .unwrap()
    }

    fn os(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_count_only_forwards_nothing() {
        let cli = parse(&["3"]);
        assert_eq!(cli.count, 3);
        assert!(cli.forwarded_args().is_empty());
    }

    #[test]
    fn test_config_and_model_forwarded_in_order() {
        let cli = parse(&["2", "sim.cfg.json", "model.json"]);
        assert_eq!(cli.forwarded_args(), os(&["sim.cfg.json", "model.json"]));
    }

    #[test]
    fn test_passthrough_follows_files() {
        let cli = parse(&["1", "cfg", "model", "--", "--no-capture", "-D", "x=1"]);
        assert_eq!(
            cli.forwarded_args(),
            os(&["cfg", "model", "--no-capture", "-D", "x=1"])
        );
    }

    #[test]
    fn test_non_numeric_count_rejected() {
        assert!(Cli::try_parse_from(["simrepeat", "three"]).is_err());
    }

    #[test]
    fn test_missing_count_rejected() {
        assert!(Cli::try_parse_from(["simrepeat"]).is_err());
    }

    #[test]
    fn test_verbose_counts() {
        let cli = parse(&["-vv", "1"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_exit_code_wraps_like_shell() {
        assert_eq!(exit_byte(0), 0);
        assert_eq!(exit_byte(127), 127);
        assert_eq!(exit_byte(128 + 9), 137);
        assert_eq!(exit_byte(256 + 3), 3);
    }
}
