//! Unresolved frame rendering
//!
//! When the external tool cannot symbolize an address we still print what
//! the dynamic linker knows about it, in the same shape glibc's
//! `backtrace_symbols` uses:
//!
//! ```text
//! /path/to/module(symbol+0x1a) [0x7f1a2b0291ca]
//! /path/to/module(+0x2f4a) [0x55d0c3a07f4a]
//! [0x55d0c3a07f4a]
//! ```

#![allow(unsafe_code)] // dladdr(3)

use std::ffi::CStr;

use crate::domain::Address;

/// Best-effort description of `addr` from the dynamic symbol tables
#[must_use]
pub fn describe(addr: Address) -> String {
    // SAFETY: dladdr only reads loader state and fills `info`
    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let found = unsafe { libc::dladdr(addr.as_ptr(), &mut info) } != 0;

    if !found || info.dli_fname.is_null() {
        return format!("[{addr}]");
    }

    // SAFETY: non-null names from dladdr point at NUL-terminated loader strings
    let module = unsafe { CStr::from_ptr(info.dli_fname) }.to_string_lossy();

    if info.dli_sname.is_null() {
        let offset = addr.value().wrapping_sub(info.dli_fbase as usize as u64);
        format!("{module}(+{offset:#x}) [{addr}]")
    } else {
        let symbol = unsafe { CStr::from_ptr(info.dli_sname) }.to_string_lossy();
        let offset = addr.value().wrapping_sub(info.dli_saddr as usize as u64);
        format!("{module}({symbol}+{offset:#x}) [{addr}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_address_is_bracketed() {
        assert_eq!(describe(Address(0x10)), "[0x10]");
    }

    #[test]
    fn test_libc_symbol_has_module_and_offset() {
        let addr = Address::from_ptr(libc::getpid as *const ());
        let text = describe(addr);
        assert!(text.ends_with(&format!("[{addr}]")), "unexpected: {text}");
        assert!(!text.starts_with('['), "no module found: {text}");
        assert!(text.contains("+0x"), "unexpected: {text}");
    }
}
