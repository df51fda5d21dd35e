//! # Symbol Resolution and Address Translation
//!
//! Converts raw return addresses captured on the crash path into
//! human-readable function names and `file:line` locations. This process is
//! called **symbolization**.
//!
//! ## How addresses get resolved
//!
//! Resolution is delegated to an external tool (`addr2line` from binutils by
//! default) run once per frame:
//!
//! ```text
//! $ addr2line -C -f -e ./demo 0x1a2f
//! A::foo(bool)
//! /home/user/demo/main.cpp:17
//! ```
//!
//! The first line is the (demangled) function, the second the source
//! location. An unknown address yields `??` and `??:0`, which is reported as
//! a failure so the caller can fall back.
//!
//! ### PIE (Position Independent Executable)
//!
//! The debug information is keyed by file-relative addresses, but a PIE is
//! loaded at a random base:
//!
//! ```text
//! File Offset = Runtime Address - Base Address
//! ```
//!
//! [`memory_maps`] reads `/proc/self/maps` once at startup so the walker can
//! translate addresses inside the executable before calling the tool.
//! Addresses in shared libraries are passed through untouched and usually
//! end up in the fallback rendering.
//!
//! ## Module Structure
//!
//! - **`resolver`**: the [`Symbolize`] trait and the [`Addr2Line`] subprocess
//!   resolver, plus output parsing
//! - **`memory_maps`**: executable range discovery for PIE relocation
//! - **`fallback`**: `dladdr`-based rendering for frames the tool cannot
//!   resolve
//!
//! ## Limitations
//!
//! - **Requires debug symbols**: compile with `debug = true` to get file:line
//! - **One process per frame**: a 64-frame trace spawns up to 64 tools
//! - **Signal context**: spawning a process from a signal handler is not
//!   async-signal-safe; it works in practice and is accepted as best effort

pub mod fallback;
pub mod memory_maps;
pub mod resolver;

pub use memory_maps::{parse_memory_maps, ExecutableLayout, MemoryRange};
pub use resolver::{parse_tool_output, Addr2Line, ResolveError, ResolvedFrame, Symbolize};
