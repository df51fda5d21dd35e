//! Stack capture and trace printing
//!
//! Two call paths reach this module: the signal handler after a fault, and
//! the `critical!` macro at an explicit call site. Both end up in
//! [`print_stack_trace`], which walks the current stack, hides its own
//! frames (and the handler's, on the signal path) and writes one line per
//! remaining frame to stderr:
//!
//! ```text
//! [3] 0x55d0c3a07f4a in faultline::crasher::A::foo at crasher.rs:21
//! [2] 0x55d0c3a07e10 in faultline::crasher::A::test at crasher.rs:14
//! [1] /usr/lib/libc.so.6(+0x29d90) [0x7f1a2b029d90]
//! [0] 0x55d0c3a06b21 in faultline::main at main.rs:40
//! ```

pub mod walker;

use std::io;

use crate::boundary;
use crate::config::{Config, MAX_FRAMES};
use crate::domain::ProgramIdentity;
use crate::symbolization::Addr2Line;

pub use walker::{limit_range, retained_range, RawTrace, StackWalker, TAIL_FRAMES};

/// Which path asked for the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOrigin {
    /// `critical!` at an application call site
    Critical,
    /// The fatal signal handler
    Signal,
}

impl CaptureOrigin {
    /// Innermost frames hidden when the anchor function is not found on the
    /// stack: the capture function, plus the handler on the signal path
    #[must_use]
    pub const fn default_head_skip(self) -> usize {
        match self {
            CaptureOrigin::Critical => 1,
            CaptureOrigin::Signal => 2,
        }
    }

    /// Entry address of the outermost function that belongs to the capture
    /// machinery for this path
    #[must_use]
    pub fn anchor(self) -> u64 {
        match self {
            CaptureOrigin::Critical => print_stack_trace as *const () as usize as u64,
            CaptureOrigin::Signal => crate::signals::handler_address(),
        }
    }
}

/// Print the current call stack to stderr
///
/// Uses the boundary's context when one is active; without it every frame
/// is printed in its unresolved form. Never panics.
#[inline(never)]
pub fn print_stack_trace(origin: CaptureOrigin) {
    let context = boundary::context();
    let max_frames = context.map_or(MAX_FRAMES, |ctx| ctx.config().max_frames);

    let trace = RawTrace::capture(origin == CaptureOrigin::Signal);
    let frames = trace.retained(origin, max_frames);

    let stderr = io::stderr();
    let mut out = stderr.lock();

    match context {
        Some(ctx) => {
            let program = ctx.program().map(ProgramIdentity::path);
            StackWalker::new(ctx.resolver(), program, ctx.layout()).render(frames, &mut out);
        }
        None => {
            let resolver = Addr2Line::from_config(&Config::default());
            StackWalker::new(&resolver, None, None).render(frames, &mut out);
        }
    }
}
