//! Deliberate crashes for the demo binary
//!
//! Each [`CrashKind`] drives one of the reporting paths end to end. Signal
//! kinds never return once the handlers are installed.

use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;

use crate::critical::CriticalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CrashKind {
    /// Arithmetic exception (SIGFPE)
    DivZero,
    /// Read from the unmapped first page (SIGSEGV)
    Segfault,
    /// Failed assertion (SIGABRT)
    Abort,
    /// Illegal instruction (SIGILL)
    Illegal,
    /// Unbounded recursion (SIGSEGV on the guard page)
    StackOverflow,
    /// Simulated ctrl+c (SIGINT)
    Interrupt,
    /// Termination request (SIGTERM)
    Terminate,
    /// `critical!` three calls deep
    Critical,
    /// Any one of the above
    Random,
    /// Exit normally
    None,
}

impl CrashKind {
    const RANDOM_POOL: [CrashKind; 8] = [
        CrashKind::DivZero,
        CrashKind::Segfault,
        CrashKind::Abort,
        CrashKind::Illegal,
        CrashKind::StackOverflow,
        CrashKind::Interrupt,
        CrashKind::Terminate,
        CrashKind::Critical,
    ];

    /// Replace `Random` with a concrete kind
    #[must_use]
    pub fn pick(self) -> Self {
        if self != CrashKind::Random {
            return self;
        }
        let seed = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.subsec_nanos());
        Self::RANDOM_POOL[seed as usize % Self::RANDOM_POOL.len()]
    }
}

/// Demo object whose methods form the call chain of the `critical` crash
#[derive(Debug, Default)]
pub struct A;

impl A {
    /// # Errors
    /// Always fails with "Foo crashed"
    #[inline(never)]
    pub fn test(&self) -> Result<(), CriticalError> {
        self.foo()
    }

    #[inline(never)]
    fn foo(&self) -> Result<(), CriticalError> {
        crate::critical!("Foo crashed");
    }

    #[inline(never)]
    pub fn bar(&self) {
        log::debug!("A::bar called");
    }
}

/// Trigger `kind`
///
/// # Errors
/// Returns the `CriticalError` raised by the `critical` kind.
#[inline(never)]
pub fn trigger(kind: CrashKind) -> Result<(), CriticalError> {
    match kind.pick() {
        CrashKind::DivZero => raise(libc::SIGFPE),
        CrashKind::Segfault => null_read(),
        CrashKind::Abort => std::process::abort(),
        CrashKind::Illegal => raise(libc::SIGILL),
        CrashKind::StackOverflow => {
            recurse(0);
        }
        CrashKind::Interrupt => raise(libc::SIGINT),
        CrashKind::Terminate => raise(libc::SIGTERM),
        CrashKind::Critical => {
            let a = A;
            a.bar();
            a.test()?;
        }
        CrashKind::Random | CrashKind::None => {}
    }
    Ok(())
}

#[allow(unsafe_code)]
#[inline(never)]
fn raise(signal: libc::c_int) {
    unsafe {
        libc::raise(signal);
    }
}

#[allow(unsafe_code)]
#[inline(never)]
fn null_read() {
    // Unmapped, but non-null: debug builds check read_volatile for null
    let ptr = std::hint::black_box(0x10usize) as *const i32;
    let value = unsafe { std::ptr::read_volatile(ptr) };
    std::hint::black_box(value);
}

#[allow(unconditional_recursion)]
#[inline(never)]
fn recurse(depth: u64) -> u64 {
    let frame = std::hint::black_box([depth; 64]);
    recurse(depth + 1) + frame[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_keeps_concrete_kinds() {
        assert_eq!(CrashKind::Segfault.pick(), CrashKind::Segfault);
        assert_eq!(CrashKind::None.pick(), CrashKind::None);
    }

    #[test]
    fn test_random_never_picks_random_or_none() {
        for _ in 0..32 {
            let kind = CrashKind::Random.pick();
            assert!(kind != CrashKind::Random && kind != CrashKind::None);
        }
    }

    #[test]
    fn test_critical_chain_reports_foo() {
        let err = A.test().unwrap_err();
        assert_eq!(err.to_string(), format!("Foo crashed (in foo at {}:{})", err.file(), err.line()));
        assert_eq!(err.function(), "foo");
    }

    #[test]
    fn test_none_returns_ok() {
        assert!(trigger(CrashKind::None).is_ok());
    }
}
