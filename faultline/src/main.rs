//! # faultline - demo binary
//!
//! Enters the crash boundary, then triggers the crash named on the command
//! line so the resulting report can be inspected (or asserted on by the
//! integration tests).

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use faultline::boundary;
use faultline::cli::Args;
use faultline::config::Config;
use faultline::crasher;
use faultline::domain::ProgramIdentity;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn config_from_args(args: &Args) -> Config {
    let mut config = Config::from_env();
    if let Some(tool) = &args.addr2line {
        config = config.with_tool(tool);
    }
    if let Some(depth) = args.max_frames {
        config = config.with_max_frames(depth);
    }
    if args.quiet {
        config = config.with_preflight(false);
    }
    config
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = config_from_args(&args);
    let program = if args.anonymous { None } else { ProgramIdentity::from_args() };

    boundary::enter(config, program).context("Failed to set up crash reporting")?;

    let kind = args.crash.pick();
    info!("Triggering {kind:?}");
    boundary::guard(|| crasher::trigger(kind));

    Ok(())
}
