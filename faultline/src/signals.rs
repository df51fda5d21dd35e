//! Fatal signal handling
//!
//! A fixed set of signals is routed to one handler that prints the stack
//! trace and a one-line description, then leaves through `_exit`. The
//! handler does work that is not async-signal-safe (allocation, spawning
//! the resolution tool); the process is already lost at that point and the
//! report is best effort.

#![allow(unsafe_code)] // sigaction(), sigaltstack() and _exit() are FFI

use std::io::{self, Write};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use libc::{c_int, c_void, siginfo_t};

use crate::capture::{self, CaptureOrigin};
use crate::domain::FaultlineError;

/// Signals routed to the crash handler
pub const HANDLED_SIGNALS: [c_int; 6] =
    [libc::SIGABRT, libc::SIGFPE, libc::SIGILL, libc::SIGINT, libc::SIGSEGV, libc::SIGTERM];

/// Size of the alternate stack the handler runs on
const ALT_STACK_SIZE: usize = 256 * 1024;

static INSTALLED: AtomicBool = AtomicBool::new(false);
static REPORTING: AtomicBool = AtomicBool::new(false);

/// The fatal conditions the handler knows how to describe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Abort,
    FloatingPoint,
    IllegalInstruction,
    Interrupt,
    SegmentationFault,
    /// SIGTERM, and anything not listed above
    Termination,
}

impl SignalKind {
    #[must_use]
    pub fn from_raw(signal: c_int) -> Self {
        match signal {
            libc::SIGABRT => SignalKind::Abort,
            libc::SIGFPE => SignalKind::FloatingPoint,
            libc::SIGILL => SignalKind::IllegalInstruction,
            libc::SIGINT => SignalKind::Interrupt,
            libc::SIGSEGV => SignalKind::SegmentationFault,
            _ => SignalKind::Termination,
        }
    }

    #[must_use]
    pub fn raw(self) -> c_int {
        match self {
            SignalKind::Abort => libc::SIGABRT,
            SignalKind::FloatingPoint => libc::SIGFPE,
            SignalKind::IllegalInstruction => libc::SIGILL,
            SignalKind::Interrupt => libc::SIGINT,
            SignalKind::SegmentationFault => libc::SIGSEGV,
            SignalKind::Termination => libc::SIGTERM,
        }
    }

    /// Line printed after the trace
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            SignalKind::Abort => "Caught SIGABRT: usually caused by an abort() or assert()",
            SignalKind::FloatingPoint => {
                "Caught SIGFPE: arithmetic exception, such as divide by zero"
            }
            SignalKind::IllegalInstruction => "Caught SIGILL: illegal instruction",
            SignalKind::Interrupt => {
                "Caught SIGINT: interactive attention signal, probably a ctrl+c"
            }
            SignalKind::SegmentationFault => "Caught SIGSEGV: segfault",
            SignalKind::Termination => {
                "Caught SIGTERM: a termination request was sent to the program"
            }
        }
    }
}

/// Install the crash handler for every signal in [`HANDLED_SIGNALS`]
///
/// Only the first successful call does anything. The alternate stack is
/// registered for the calling thread, so stack overflows are reported when
/// they happen on that thread.
///
/// # Errors
/// `AltStack` or `SignalInstall` when the kernel rejects the registration.
pub fn install() -> Result<(), FaultlineError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let result = install_alt_stack()
        .and_then(|()| HANDLED_SIGNALS.iter().try_for_each(|&signal| install_handler(signal)));
    if result.is_err() {
        INSTALLED.store(false, Ordering::SeqCst);
    }
    result
}

#[must_use]
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

/// Entry address of the handler, used to hide its frames from the trace
#[must_use]
pub fn handler_address() -> u64 {
    handle_signal as *const () as usize as u64
}

fn install_alt_stack() -> Result<(), FaultlineError> {
    // Never freed: the handler may run at any point until exit
    let stack: &'static mut [u8] = vec![0u8; ALT_STACK_SIZE].leak();
    let alt = libc::stack_t {
        ss_sp: stack.as_mut_ptr().cast::<c_void>(),
        ss_flags: 0,
        ss_size: ALT_STACK_SIZE,
    };

    if unsafe { libc::sigaltstack(&alt, ptr::null_mut()) } != 0 {
        return Err(FaultlineError::AltStack(io::Error::last_os_error()));
    }
    Ok(())
}

fn install_handler(signal: c_int) -> Result<(), FaultlineError> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handle_signal as *const () as libc::sighandler_t;
    action.sa_flags = libc::SA_SIGINFO | libc::SA_ONSTACK;
    unsafe { libc::sigemptyset(&mut action.sa_mask) };

    if unsafe { libc::sigaction(signal, &action, ptr::null_mut()) } != 0 {
        return Err(FaultlineError::SignalInstall { signal, source: io::Error::last_os_error() });
    }
    Ok(())
}

extern "C" fn handle_signal(signal: c_int, _info: *mut siginfo_t, _context: *mut c_void) {
    // A fault while reporting: give up on the report
    if REPORTING.swap(true, Ordering::SeqCst) {
        unsafe { libc::_exit(libc::EXIT_FAILURE) };
    }

    capture::print_stack_trace(CaptureOrigin::Signal);

    let mut stderr = io::stderr();
    let _ = writeln!(stderr, "{}", SignalKind::from_raw(signal).description());
    let _ = stderr.flush();

    unsafe { libc::_exit(libc::EXIT_FAILURE) };
}
