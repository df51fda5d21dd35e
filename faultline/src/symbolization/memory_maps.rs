//! Memory mapping utilities for relocating our own addresses
//!
//! Position-independent executables are loaded at a randomized base, while
//! the debug information `addr2line` reads is keyed by file-relative
//! addresses. This module parses `/proc/self/maps` to find where the
//! executable is mapped so captured addresses can be translated before
//! lookup.

use std::fs;
use std::path::Path;

use log::{debug, info};
use object::{Object, ObjectKind};

use crate::domain::{Address, FaultlineError};

/// Memory range of a loaded binary in the process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Where the running executable is mapped, and whether it was relocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutableLayout {
    pub range: MemoryRange,
    pub position_independent: bool,
}

impl ExecutableLayout {
    /// Discover the layout of the executable at `program` in this process
    ///
    /// # Errors
    /// Returns an error if `/proc/self/maps` cannot be read or the executable
    /// does not appear in it.
    pub fn detect(program: &Path) -> Result<Self, FaultlineError> {
        let exe = fs::canonicalize(program).or_else(|_| std::env::current_exe())?;
        let exe_path = exe.to_string_lossy();

        let maps = fs::read_to_string("/proc/self/maps")
            .map_err(|e| FaultlineError::MemoryMapsParseFailed(e.to_string()))?;
        let range = parse_memory_maps(&maps, &exe_path)?;
        let position_independent = is_position_independent(&exe);

        info!(
            "Executable memory range: 0x{:x} - 0x{:x} (size: {} KB, pie: {})",
            range.start,
            range.end,
            (range.end - range.start) / 1024,
            position_independent
        );

        Ok(Self { range, position_independent })
    }

    /// Address to hand to the resolution tool for a captured `addr`
    ///
    /// Addresses inside a relocated executable become file-relative; anything
    /// else (shared libraries, fixed-address executables) is passed as-is.
    #[must_use]
    pub fn lookup_address(&self, addr: Address) -> Address {
        if self.position_independent && self.range.contains(addr.value()) {
            Address(addr.value() - self.range.start)
        } else {
            addr
        }
    }
}

/// Find the full range covered by every mapping of `binary_path`
///
/// Returns the range from the minimum start address to the maximum end
/// address across all matching lines.
///
/// # Errors
/// Returns an error if a matching line is malformed or the binary is not found
pub fn parse_memory_maps(maps: &str, binary_path: &str) -> Result<MemoryRange, FaultlineError> {
    let mut start_addr = None;
    let mut end_addr = None;

    for line in maps.lines() {
        // "start-end perms offset dev inode pathname"
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 || parts[5..].join(" ") != binary_path {
            continue;
        }

        let (start, end) = parts[0].split_once('-').ok_or_else(|| {
            FaultlineError::MemoryMapsParseFailed(format!("Malformed range: {}", parts[0]))
        })?;
        let start = u64::from_str_radix(start, 16)
            .map_err(|e| FaultlineError::MemoryMapsParseFailed(format!("Range start {start}: {e}")))?;
        let end = u64::from_str_radix(end, 16)
            .map_err(|e| FaultlineError::MemoryMapsParseFailed(format!("Range end {end}: {e}")))?;

        start_addr = Some(start_addr.map_or(start, |s: u64| s.min(start)));
        end_addr = Some(end_addr.map_or(end, |e: u64| e.max(end)));
    }

    match (start_addr, end_addr) {
        (Some(start), Some(end)) => Ok(MemoryRange { start, end }),
        _ => Err(FaultlineError::NoMemoryRangeFound(binary_path.to_string())),
    }
}

/// `ET_DYN` executables are relocated at load time; unreadable files are
/// assumed to be PIE since that is what the toolchains emit by default
fn is_position_independent(path: &Path) -> bool {
    let Ok(data) = fs::read(path) else {
        debug!("Cannot read {} to check for PIE, assuming relocated", path.display());
        return true;
    };
    match object::File::parse(&*data) {
        Ok(obj) => obj.kind() == ObjectKind::Dynamic,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55d0c3a00000-55d0c3a05000 r--p 00000000 08:01 1234    /usr/local/bin/demo
55d0c3a05000-55d0c3a40000 r-xp 00005000 08:01 1234    /usr/local/bin/demo
55d0c3a40000-55d0c3a48000 rw-p 00040000 08:01 1234    /usr/local/bin/demo
55d0c4000000-55d0c4021000 rw-p 00000000 00:00 0       [heap]
7f1a2b000000-7f1a2b1c0000 r-xp 00000000 08:01 5678    /usr/lib/libc.so.6
";

    #[test]
    fn test_memory_range_contains() {
        let range = MemoryRange { start: 0x1000, end: 0x2000 };

        assert!(range.contains(0x1000));
        assert!(range.contains(0x1500));
        assert!(range.contains(0x1FFF));
        assert!(!range.contains(0x0FFF));
        assert!(!range.contains(0x2000));
        assert!(!range.contains(0x2001));
    }

    #[test]
    fn test_parse_memory_maps_spans_all_segments() {
        let range = parse_memory_maps(MAPS, "/usr/local/bin/demo").unwrap();
        assert_eq!(range, MemoryRange { start: 0x55d0_c3a0_0000, end: 0x55d0_c3a4_8000 });
    }

    #[test]
    fn test_parse_memory_maps_requires_exact_path() {
        let err = parse_memory_maps(MAPS, "/usr/local/bin/dem").unwrap_err();
        assert!(matches!(err, FaultlineError::NoMemoryRangeFound(_)));
    }

    #[test]
    fn test_lookup_address_relocates_pie_only() {
        let range = MemoryRange { start: 0x7f00_0000_0000, end: 0x7f00_0010_0000 };
        let pie = ExecutableLayout { range, position_independent: true };
        let fixed = ExecutableLayout { range, position_independent: false };

        assert_eq!(pie.lookup_address(Address(0x7f00_0005_0000)), Address(0x5_0000));
        assert_eq!(pie.lookup_address(Address(0x7f00_0100_0000)), Address(0x7f00_0100_0000));
        assert_eq!(fixed.lookup_address(Address(0x7f00_0005_0000)), Address(0x7f00_0005_0000));
    }

    #[test]
    fn test_detect_self() {
        // Depends on /proc being mounted, so only check it doesn't panic
        let exe = std::env::current_exe().expect("Failed to get current exe");
        let _result = ExecutableLayout::detect(&exe);
    }
}
