//! Pre-flight checks for crash reporting
//!
//! Run once at boundary entry, before anything has gone wrong. Nothing here
//! is fatal: each finding predicts how much a later trace will be able to
//! resolve, and is reported as a warning.

use std::path::Path;
use std::process::{Command, Stdio};

use log::{debug, warn};
use object::{Object, ObjectSection};
use thiserror::Error;

use crate::config::Config;
use crate::domain::ProgramIdentity;

/// Something that will degrade stack traces
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreflightWarning {
    #[error("no program identity recorded, stack traces will show addresses only")]
    NoProgramIdentity,

    #[error("binary not found: {0}, stack traces will show addresses only")]
    ProgramMissing(String),

    #[error("cannot run {tool}: {reason}, stack traces will show addresses only")]
    ToolUnavailable { tool: String, reason: String },

    #[error("binary stripped, stack traces will show addresses only")]
    Stripped,

    #[error("no DWARF debug info, source locations unavailable")]
    NoDebugInfo,
}

/// Run all checks, log each finding and return them
pub fn run_preflight_checks(program: Option<&ProgramIdentity>, config: &Config) -> Vec<PreflightWarning> {
    let mut warnings = Vec::new();

    match program {
        None => warnings.push(PreflightWarning::NoProgramIdentity),
        Some(identity) => {
            let path = identity.path();
            match check_binary_exists(path) {
                Some(missing) => warnings.push(missing),
                None => warnings.extend(check_debug_symbols(path)),
            }
        }
    }

    warnings.extend(check_tool(&config.tool));

    for warning in &warnings {
        warn!("{warning}");
    }
    if warnings.is_empty() {
        debug!("Preflight checks passed");
    }
    warnings
}

fn check_binary_exists(path: &Path) -> Option<PreflightWarning> {
    if path.is_file() {
        None
    } else {
        Some(PreflightWarning::ProgramMissing(path.display().to_string()))
    }
}

/// The tool only needs to start; it is killed straight away so a
/// misbehaving one cannot stall startup
fn check_tool(tool: &Path) -> Option<PreflightWarning> {
    let spawned = Command::new(tool)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match spawned {
        Ok(mut child) => {
            let _ = child.kill();
            let _ = child.wait();
            None
        }
        Err(e) => Some(PreflightWarning::ToolUnavailable {
            tool: tool.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Check if the binary has debug symbols for proper stack trace resolution
fn check_debug_symbols(path: &Path) -> Option<PreflightWarning> {
    let file_data = std::fs::read(path).ok()?;

    // Not an object file: nothing useful to say about it
    let obj = object::File::parse(&*file_data).ok()?;

    let has_debug_info = obj.section_by_name(".debug_info").is_some_and(|s| s.size() > 0);
    let has_symtab = obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0);

    if !has_debug_info && !has_symtab {
        Some(PreflightWarning::Stripped)
    } else if !has_debug_info {
        Some(PreflightWarning::NoDebugInfo)
    } else {
        None
    }
}
