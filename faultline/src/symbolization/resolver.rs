//! Address-to-line resolution through an external tool
//!
//! One subprocess per address: `addr2line -C -f -e <program> <address>`.
//! The tool answers with two lines, the function name and `path:line`, or
//! `??` / `??:0` when it has no symbol information for the address.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use rustc_demangle::demangle;
use thiserror::Error;

use crate::config::Config;
use crate::domain::Address;

/// Program paths longer than this are cut before being handed to the tool
pub const MAX_PROGRAM_PATH: usize = 256;

/// First character of the location line when the tool could not resolve
pub const UNRESOLVED_MARKER: char = '?';

/// Symbol and compact source location for one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame {
    /// Function name as reported (and demangled) by the tool
    pub symbol: String,
    /// `file:line`, with directories stripped
    pub location: String,
}

/// Why an address could not be symbolized
///
/// Always recovered by the caller, which prints the unresolved form instead.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No program identity recorded")]
    MissingProgram,

    #[error("Failed to launch {tool}: {source}")]
    Spawn { tool: String, source: io::Error },

    #[error("Resolution tool produced no output")]
    NoOutput,

    #[error("Resolution tool produced a single line")]
    Incomplete,

    #[error("No symbol information for {0}")]
    Unresolved(Address),

    #[error("Resolution tool did not answer within {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Something that can turn an address inside `program` into a symbol
pub trait Symbolize {
    /// Resolve `address` against the executable at `program`
    ///
    /// # Errors
    /// Returns a [`ResolveError`] when no symbol is available; callers fall
    /// back to the unresolved rendering.
    fn resolve(&self, program: &Path, address: Address) -> Result<ResolvedFrame, ResolveError>;
}

/// Resolver backed by binutils' `addr2line` (or a compatible tool)
#[derive(Debug, Clone)]
pub struct Addr2Line {
    tool: PathBuf,
    timeout: Option<Duration>,
}

impl Addr2Line {
    #[must_use]
    pub fn new(tool: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self { tool: tool.into(), timeout }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tool.clone(), config.resolve_timeout)
    }

    #[must_use]
    pub fn tool(&self) -> &Path {
        &self.tool
    }

    /// Command line for one lookup (not yet spawned)
    #[must_use]
    pub fn command(&self, program: &Path, address: Address) -> Command {
        let mut cmd = Command::new(&self.tool);
        cmd.arg("-C")
            .arg("-f")
            .arg("-e")
            .arg(truncate_program_path(program))
            .arg(address.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd
    }
}

impl Symbolize for Addr2Line {
    fn resolve(&self, program: &Path, address: Address) -> Result<ResolvedFrame, ResolveError> {
        if program.as_os_str().is_empty() {
            return Err(ResolveError::MissingProgram);
        }

        let mut child = self.command(program, address).spawn().map_err(|source| {
            ResolveError::Spawn { tool: self.tool.display().to_string(), source }
        })?;

        let output = match child.stdout.take() {
            Some(stdout) => read_two_lines(stdout, self.timeout),
            None => Err(ResolveError::NoOutput),
        };

        // The pipe is closed by now; make sure the child never outlives us
        reap(&mut child);

        let (first, second) = output?;
        parse_tool_output(first.as_deref(), second.as_deref(), address)
    }
}

/// Turn the tool's two output lines into a [`ResolvedFrame`]
///
/// # Errors
/// - `NoOutput` when the first line is missing
/// - `Incomplete` when the location line is missing
/// - `Unresolved` when the location starts with [`UNRESOLVED_MARKER`]
pub fn parse_tool_output(
    first: Option<&str>,
    second: Option<&str>,
    address: Address,
) -> Result<ResolvedFrame, ResolveError> {
    let first = first.ok_or(ResolveError::NoOutput)?;
    let second = second.ok_or(ResolveError::Incomplete)?;

    if second.starts_with(UNRESOLVED_MARKER) {
        return Err(ResolveError::Unresolved(address));
    }

    Ok(ResolvedFrame { symbol: clean_symbol(first), location: compact_location(second) })
}

/// Strip line terminators and demangle anything still in Rust mangled form
fn clean_symbol(line: &str) -> String {
    let symbol = line.trim_end_matches(&['\r', '\n'][..]);
    if symbol.starts_with("_ZN") || symbol.starts_with("_R") {
        format!("{:#}", demangle(symbol))
    } else {
        symbol.to_string()
    }
}

/// Keep only the final path component of `path:line`
fn compact_location(line: &str) -> String {
    let mut location = line.trim_end_matches(&['\r', '\n'][..]);
    if let Some(idx) = location.find(" (discriminator ") {
        location = &location[..idx];
    }
    match location.rfind('/') {
        Some(idx) => location[idx + 1..].to_string(),
        None => location.to_string(),
    }
}

/// Cut the program path to [`MAX_PROGRAM_PATH`] bytes
fn truncate_program_path(program: &Path) -> Cow<'_, OsStr> {
    let bytes = program.as_os_str().as_bytes();
    if bytes.len() <= MAX_PROGRAM_PATH {
        Cow::Borrowed(program.as_os_str())
    } else {
        Cow::Owned(OsStr::from_bytes(&bytes[..MAX_PROGRAM_PATH]).to_os_string())
    }
}

fn reap(child: &mut Child) {
    if !matches!(child.try_wait(), Ok(Some(_))) {
        let _ = child.kill();
    }
    let _ = child.wait();
}

type ToolLines = (Option<String>, Option<String>);

fn read_two_lines(stdout: ChildStdout, timeout: Option<Duration>) -> Result<ToolLines, ResolveError> {
    let reader = DeadlineReader { inner: stdout, deadline: timeout.map(|t| Instant::now() + t) };
    let mut reader = BufReader::new(reader);

    let read = |reader: &mut BufReader<DeadlineReader>| -> Result<Option<String>, ResolveError> {
        match read_line(reader) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                Err(ResolveError::TimedOut(timeout.unwrap_or_default()))
            }
            other => Ok(other?),
        }
    };

    let first = read(&mut reader)?;
    let second = if first.is_some() { read(&mut reader)? } else { None };
    Ok((first, second))
}

fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Pipe reader that gives up once `deadline` has passed
struct DeadlineReader {
    inner: ChildStdout,
    deadline: Option<Instant>,
}

impl Read for DeadlineReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(deadline) = self.deadline {
            wait_readable(self.inner.as_raw_fd(), deadline)?;
        }
        self.inner.read(buf)
    }
}

#[allow(unsafe_code)] // poll(2)
fn wait_readable(fd: libc::c_int, deadline: Instant) -> io::Result<()> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::ErrorKind::TimedOut.into());
        }

        let timeout_ms = libc::c_int::try_from(remaining.as_millis()).unwrap_or(libc::c_int::MAX).max(1);
        let mut pfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };

        match rc {
            0 => return Err(io::ErrorKind::TimedOut.into()),
            n if n > 0 => return Ok(()),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Address = Address(0x4011d6);

    #[test]
    fn test_parse_resolved_output() {
        let frame = parse_tool_output(
            Some("A::foo(bool)\n"),
            Some("/home/user/project/demo/main.cpp:15\n"),
            ADDR,
        )
        .unwrap();
        assert_eq!(frame.symbol, "A::foo(bool)");
        assert_eq!(frame.location, "main.cpp:15");
    }

    #[test]
    fn test_parse_strips_carriage_return_and_discriminator() {
        let frame =
            parse_tool_output(Some("main\r\n"), Some("/src/main.rs:42 (discriminator 3)\n"), ADDR)
                .unwrap();
        assert_eq!(frame.symbol, "main");
        assert_eq!(frame.location, "main.rs:42");
    }

    #[test]
    fn test_parse_location_without_directories() {
        let frame = parse_tool_output(Some("main\n"), Some("main.cpp:6\n"), ADDR).unwrap();
        assert_eq!(frame.location, "main.cpp:6");
    }

    #[test]
    fn test_parse_demangles_rust_symbols() {
        let frame = parse_tool_output(
            Some("_ZN9faultline7crasher1A3foo17h0123456789abcdefE\n"),
            Some("/src/crasher.rs:10\n"),
            ADDR,
        )
        .unwrap();
        assert_eq!(frame.symbol, "faultline::crasher::A::foo");
    }

    #[test]
    fn test_parse_unresolved_marker() {
        let err = parse_tool_output(Some("??\n"), Some("??:0\n"), ADDR).unwrap_err();
        assert!(matches!(err, ResolveError::Unresolved(addr) if addr == ADDR));

        let err = parse_tool_output(Some("main\n"), Some("?\n"), ADDR).unwrap_err();
        assert!(matches!(err, ResolveError::Unresolved(_)));
    }

    #[test]
    fn test_parse_missing_lines() {
        assert!(matches!(parse_tool_output(None, None, ADDR), Err(ResolveError::NoOutput)));
        assert!(matches!(parse_tool_output(Some("main\n"), None, ADDR), Err(ResolveError::Incomplete)));
    }

    #[test]
    fn test_program_path_truncation() {
        let long = "/".to_string() + &"a".repeat(400);
        let truncated = truncate_program_path(Path::new(&long));
        assert_eq!(truncated.len(), MAX_PROGRAM_PATH);

        let short = Path::new("/usr/bin/demo");
        assert_eq!(&*truncate_program_path(short), OsStr::new("/usr/bin/demo"));
    }

    #[test]
    fn test_command_line() {
        let resolver = Addr2Line::new("addr2line", None);
        let cmd = resolver.command(Path::new("./demo"), Address(0x4011d6));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "addr2line");
        assert_eq!(args, ["-C", "-f", "-e", "./demo", "0x4011d6"]);
    }

    #[test]
    fn test_missing_tool_is_spawn_error() {
        let resolver = Addr2Line::new("/nonexistent/faultline-addr2line", None);
        let err = resolver.resolve(Path::new("/bin/sh"), ADDR).unwrap_err();
        assert!(matches!(err, ResolveError::Spawn { .. }));
    }

    #[test]
    fn test_empty_program_is_rejected() {
        let resolver = Addr2Line::new("addr2line", None);
        let err = resolver.resolve(Path::new(""), ADDR).unwrap_err();
        assert!(matches!(err, ResolveError::MissingProgram));
    }
}
