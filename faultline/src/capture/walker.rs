//! Stack walking and per-frame rendering

use std::io::Write;
use std::ops::Range;
use std::path::Path;

use super::CaptureOrigin;
use crate::config::MAX_FRAMES;
use crate::domain::Address;
use crate::symbolization::{fallback, ExecutableLayout, ResolveError, ResolvedFrame, Symbolize};

/// Outermost frames always dropped (process startup, no application info)
pub const TAIL_FRAMES: usize = 2;

/// Return addresses captured from one walk, innermost first
///
/// Lives in fixed-size buffers so capturing does not allocate.
pub struct RawTrace {
    ips: [Address; MAX_FRAMES],
    symbols: [u64; MAX_FRAMES],
    len: usize,
}

impl RawTrace {
    /// Walk the current stack, keeping the innermost [`MAX_FRAMES`] addresses
    ///
    /// `unsynchronized` skips the `backtrace` crate's global lock, which a
    /// signal may have interrupted mid-walk.
    #[inline(never)]
    #[must_use]
    #[allow(unsafe_code)]
    pub fn capture(unsynchronized: bool) -> Self {
        let mut trace = Self::empty();

        let mut record = |frame: &backtrace::Frame| {
            trace.ips[trace.len] = Address::from_ptr(frame.ip());
            trace.symbols[trace.len] = frame.symbol_address() as usize as u64;
            trace.len += 1;
            trace.len < MAX_FRAMES
        };

        if unsynchronized {
            // SAFETY: only reached from the fatal signal handler, which never
            // returns into the interrupted walk
            unsafe {
                backtrace::trace_unsynchronized(&mut record);
            }
        } else {
            backtrace::trace(&mut record);
        }

        trace
    }

    /// Trace built from already-known frames
    #[must_use]
    pub fn from_frames(frames: &[(Address, u64)]) -> Self {
        let mut trace = Self::empty();
        for (ip, symbol) in frames.iter().take(MAX_FRAMES) {
            trace.ips[trace.len] = *ip;
            trace.symbols[trace.len] = *symbol;
            trace.len += 1;
        }
        trace
    }

    fn empty() -> Self {
        Self { ips: [Address(0); MAX_FRAMES], symbols: [0; MAX_FRAMES], len: 0 }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entry addresses of the captured frames' functions, innermost first
    #[must_use]
    pub fn symbols(&self) -> &[u64] {
        &self.symbols[..self.len]
    }

    /// Frames worth printing for a capture requested by `origin`, at most
    /// `max_frames` of them counted from the innermost retained frame
    #[must_use]
    pub fn retained(&self, origin: CaptureOrigin, max_frames: usize) -> &[Address] {
        let range = retained_range(self.symbols(), origin.anchor(), origin.default_head_skip());
        &self.ips[limit_range(range, max_frames)]
    }
}

/// Index range of the frames left after hiding the capture machinery and
/// the startup frames
///
/// Everything up to and including the innermost frame whose symbol starts at
/// `anchor` is hidden; if no frame matches, `default_head` frames are.
#[must_use]
pub fn retained_range(symbols: &[u64], anchor: u64, default_head: usize) -> Range<usize> {
    let head = symbols
        .iter()
        .position(|&symbol| symbol != 0 && symbol == anchor)
        .map_or(default_head, |idx| idx + 1);
    let end = symbols.len().saturating_sub(TAIL_FRAMES);

    if head >= end {
        0..0
    } else {
        head..end
    }
}

/// Keep the first `max_frames` indices of `range`
#[must_use]
pub fn limit_range(range: Range<usize>, max_frames: usize) -> Range<usize> {
    let end = range.end.min(range.start.saturating_add(max_frames));
    range.start..end
}

/// Renders captured frames, resolving each through a [`Symbolize`]
pub struct StackWalker<'a, S: Symbolize> {
    resolver: &'a S,
    program: Option<&'a Path>,
    layout: Option<&'a ExecutableLayout>,
}

impl<'a, S: Symbolize> StackWalker<'a, S> {
    /// `program` is the executable handed to the resolver; with `None` the
    /// resolver is never called and every frame uses the fallback text
    pub fn new(
        resolver: &'a S,
        program: Option<&'a Path>,
        layout: Option<&'a ExecutableLayout>,
    ) -> Self {
        Self { resolver, program, layout }
    }

    /// Write one line per frame, innermost first
    ///
    /// Indices count down from `frames.len() - 1` to `0`. Write errors are
    /// ignored: there is nowhere left to report them.
    pub fn render<W: Write>(&self, frames: &[Address], out: &mut W) {
        let total = frames.len();
        for (i, &addr) in frames.iter().enumerate() {
            let index = total - 1 - i;
            let line = match self.symbolize(addr) {
                Ok(frame) => format_resolved(index, addr, &frame),
                Err(_) => format_unresolved(index, &fallback::describe(addr)),
            };
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    }

    fn symbolize(&self, addr: Address) -> Result<ResolvedFrame, ResolveError> {
        let program = self.program.ok_or(ResolveError::MissingProgram)?;
        let lookup = self.layout.map_or(addr, |layout| layout.lookup_address(addr));
        self.resolver.resolve(program, lookup)
    }
}

/// `[index] address in symbol at file:line`
#[must_use]
pub fn format_resolved(index: usize, addr: Address, frame: &ResolvedFrame) -> String {
    format!("[{index}] {addr} in {} at {}", frame.symbol, frame.location)
}

/// `[index] fallback`
#[must_use]
pub fn format_unresolved(index: usize, fallback: &str) -> String {
    format!("[{index}] {fallback}")
}
