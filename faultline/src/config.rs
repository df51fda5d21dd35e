//! Crash reporter configuration
//!
//! Defaults match the classic behaviour (`addr2line` on `PATH`, 64 frames).
//! Each field can be overridden from the environment so a deployed binary can
//! be pointed at a different toolchain without rebuilding:
//!
//! - `FAULTLINE_ADDR2LINE`: resolution tool to invoke (default `addr2line`)
//! - `FAULTLINE_MAX_FRAMES`: frames printed per trace, clamped to [`MAX_FRAMES`]
//! - `FAULTLINE_RESOLVE_TIMEOUT_MS`: per-frame deadline, `0` waits forever
//! - `FAULTLINE_PREFLIGHT`: `0` skips the startup checks

use log::warn;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on captured stack addresses
pub const MAX_FRAMES: usize = 64;

/// Tool used when nothing else is configured
pub const DEFAULT_TOOL: &str = "addr2line";

/// How long a single resolution may take before the frame falls back
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address-to-line tool, looked up on `PATH` when relative
    pub tool: PathBuf,
    /// Maximum number of frames printed per trace
    pub max_frames: usize,
    /// Deadline for one tool invocation (`None` waits indefinitely)
    pub resolve_timeout: Option<Duration>,
    /// Run the startup checks in [`crate::preflight`]
    pub preflight: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: PathBuf::from(DEFAULT_TOOL),
            max_frames: MAX_FRAMES,
            resolve_timeout: Some(DEFAULT_RESOLVE_TIMEOUT),
            preflight: true,
        }
    }
}

impl Config {
    /// Defaults overridden by `FAULTLINE_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(tool) = lookup("FAULTLINE_ADDR2LINE").filter(|t| !t.trim().is_empty()) {
            config.tool = PathBuf::from(tool.trim());
        }

        if let Some(raw) = lookup("FAULTLINE_MAX_FRAMES") {
            match raw.trim().parse::<usize>() {
                Ok(depth) => config = config.with_max_frames(depth),
                Err(_) => warn!("Ignoring FAULTLINE_MAX_FRAMES={raw}: not a number"),
            }
        }

        if let Some(raw) = lookup("FAULTLINE_RESOLVE_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.resolve_timeout = None,
                Ok(ms) => config.resolve_timeout = Some(Duration::from_millis(ms)),
                Err(_) => warn!("Ignoring FAULTLINE_RESOLVE_TIMEOUT_MS={raw}: not a number"),
            }
        }

        if let Some(raw) = lookup("FAULTLINE_PREFLIGHT") {
            config.preflight = !matches!(raw.trim(), "0" | "false" | "off" | "no");
        }

        config
    }

    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Frames printed per trace, clamped to `1..=MAX_FRAMES`
    #[must_use]
    pub fn with_max_frames(mut self, depth: usize) -> Self {
        self.max_frames = depth.clamp(1, MAX_FRAMES);
        self
    }

    #[must_use]
    pub fn with_resolve_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }
}
