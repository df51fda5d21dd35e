//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::crasher::CrashKind;

#[derive(Parser)]
#[command(
    name = "faultline",
    about = "Crash on purpose and print a symbolized stack trace",
    after_help = "\
EXAMPLES:
    faultline segfault                       Null pointer read, reported from the signal handler
    faultline critical                       critical!() three calls deep
    faultline random --max-frames 8          Any crash, shorter trace
    RUST_LOG=info faultline abort            Show setup logging"
)]
pub struct Args {
    /// Which crash to trigger
    #[arg(value_enum, default_value = "random")]
    pub crash: CrashKind,

    /// Address-to-line tool used for symbolization
    #[arg(long, value_name = "PATH")]
    pub addr2line: Option<PathBuf>,

    /// Maximum number of frames to capture (1-64)
    #[arg(long, value_name = "N")]
    pub max_frames: Option<usize>,

    /// Do not record the program identity; frames stay unresolved
    #[arg(long)]
    pub anonymous: bool,

    /// Suppress non-essential output (skip preflight warnings)
    #[arg(short, long)]
    pub quiet: bool,
}
