//! Domain types for the crash path
//!
//! These newtype wrappers keep raw addresses apart from sizes and offsets,
//! and make the "program identity may be missing" case explicit.

use std::fmt;
use std::path::{Path, PathBuf};

/// Instruction address captured from the call stack
///
/// Displays the way a C `void*` streams: lowercase hex with a `0x` prefix
/// and no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl Address {
    /// Raw numeric value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Address of a code or data pointer
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Address(ptr as usize as u64)
    }

    #[must_use]
    pub fn as_ptr(self) -> *const libc::c_void {
        self.0 as usize as *const libc::c_void
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<usize> for Address {
    fn from(addr: usize) -> Self {
        Address(addr as u64)
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Address(addr)
    }
}

/// Path of the running executable (validated, non-empty)
///
/// Conventionally `argv[0]`. Required to invoke the resolution tool; when it
/// is absent every frame is printed in its unresolved form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramIdentity(PathBuf);

impl ProgramIdentity {
    /// Returns `None` for an empty path
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(Self(path))
        }
    }

    /// Identity taken from the process's own argument zero
    #[must_use]
    pub fn from_args() -> Option<Self> {
        std::env::args_os().next().and_then(Self::new)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ProgramIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
