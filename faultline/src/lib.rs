//! # faultline - stack traces for fatal errors
//!
//! faultline prints a symbolized call stack when a program hits a fatal
//! condition, then terminates it. Two kinds of conditions are covered:
//! fault signals delivered by the OS (SIGSEGV, SIGILL, SIGFPE, SIGABRT,
//! SIGINT, SIGTERM) and critical errors raised by the application with
//! [`critical!`].
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     boundary::run(program, body)                │
//! │   records ProgramIdentity + layout, installs signal handlers    │
//! └───────────────┬─────────────────────────────────┬───────────────┘
//!                 │ fault signal                    │ critical!(...)
//!                 ▼                                 ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │   signals::handle_signal     │   │   capture::print_stack_trace │
//! │   (alternate stack)          │   │   + CriticalError returned   │
//! └───────────────┬──────────────┘   └───────────────┬──────────────┘
//!                 └────────────────┬─────────────────┘
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  capture: walk stack (≤ 64 frames), hide capture frames         │
//! │                                  │                              │
//! │                                  ▼                              │
//! │  symbolization: relocate (PIE) → addr2line subprocess           │
//! │                 └─ on failure: dladdr fallback text             │
//! └──────────────────────────────────┬──────────────────────────────┘
//!                                    ▼
//!                     stderr, then exit(EXIT_FAILURE)
//! ```
//!
//! ## Module Structure
//!
//! - [`boundary`]: Scoped region that enables reporting and turns a
//!   propagated [`CriticalError`] into a failed exit
//! - [`capture`]: Stack walking, frame skipping and line rendering
//! - [`symbolization`]: Address resolution through an external
//!   `addr2line`, PIE relocation and the unresolved fallback
//! - [`signals`]: Handler installation for the fatal signal set
//! - [`critical`]: [`CriticalError`] plus the `critical!` and
//!   `function_name!` macros
//! - [`config`]: Settings and their `FAULTLINE_*` environment overrides
//! - [`preflight`]: Startup warnings about what a trace will be able to show
//! - [`domain`]: Core domain types (Address, ProgramIdentity) and errors
//! - [`cli`], [`crasher`]: The demo binary's arguments and crash triggers
//!
//! ## Typical Usage
//!
//! ```no_run
//! use faultline::{boundary, critical, CriticalError};
//! use faultline::domain::ProgramIdentity;
//!
//! fn parse(input: &str) -> Result<u32, CriticalError> {
//!     match input.parse() {
//!         Ok(n) => Ok(n),
//!         Err(_) => critical!("cannot parse {input:?}"),
//!     }
//! }
//!
//! fn main() {
//!     let n = boundary::run(ProgramIdentity::from_args(), || parse("42"));
//!     println!("{n}");
//! }
//! ```
//!
//! ## Key Concepts
//!
//! - **Program identity**: path of the running executable (`argv[0]`), handed
//!   to `addr2line -e`; without it every frame prints unresolved
//! - **PIE/ASLR**: addresses in a relocated executable are made file-relative
//!   before lookup
//! - **Terminate after report**: no path resumes execution after a fault

pub mod boundary;
pub mod capture;
pub mod cli;
pub mod config;
pub mod crasher;
pub mod critical;
pub mod domain;
pub mod preflight;
pub mod signals;
pub mod symbolization;

pub use critical::CriticalError;
