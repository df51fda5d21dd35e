//! The region inside which crashes are reported
//!
//! [`run`] is meant to wrap the whole body of `main`. On entry it records
//! the program identity in a write-once [`CrashContext`] and installs the
//! signal handlers; a [`CriticalError`](crate::CriticalError) that reaches
//! it is printed and the process exits with `EXIT_FAILURE`.

use std::fmt;
use std::process;
use std::sync::OnceLock;

use log::{debug, info, warn};

use crate::config::Config;
use crate::domain::{FaultlineError, ProgramIdentity};
use crate::preflight;
use crate::signals;
use crate::symbolization::{Addr2Line, ExecutableLayout};

static CONTEXT: OnceLock<CrashContext> = OnceLock::new();

/// Everything the crash path reads, fixed before the first report
#[derive(Debug)]
pub struct CrashContext {
    program: Option<ProgramIdentity>,
    layout: Option<ExecutableLayout>,
    resolver: Addr2Line,
    config: Config,
}

impl CrashContext {
    fn new(config: Config, program: Option<ProgramIdentity>) -> Self {
        let layout = program.as_ref().and_then(|identity| {
            ExecutableLayout::detect(identity.path())
                .map_err(|e| warn!("Addresses will be resolved without relocation: {e}"))
                .ok()
        });

        Self { resolver: Addr2Line::from_config(&config), program, layout, config }
    }

    #[must_use]
    pub fn program(&self) -> Option<&ProgramIdentity> {
        self.program.as_ref()
    }

    #[must_use]
    pub fn layout(&self) -> Option<&ExecutableLayout> {
        self.layout.as_ref()
    }

    #[must_use]
    pub fn resolver(&self) -> &Addr2Line {
        &self.resolver
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// The active context, once a boundary has been entered
#[must_use]
pub fn context() -> Option<&'static CrashContext> {
    CONTEXT.get()
}

/// Record the context and install the signal handlers
///
/// The first call wins; later calls return the existing context and ignore
/// their arguments.
///
/// # Errors
/// Returns an error if the signal handlers cannot be installed. The context
/// is recorded either way, so `critical!` reports still resolve.
pub fn enter(
    config: Config,
    program: Option<ProgramIdentity>,
) -> Result<&'static CrashContext, FaultlineError> {
    let mut created = false;
    let ctx = CONTEXT.get_or_init(|| {
        created = true;
        CrashContext::new(config, program)
    });

    if created {
        match &ctx.program {
            Some(identity) => info!("Crash reporting enabled for {identity}"),
            None => info!("Crash reporting enabled without a program identity"),
        }
        if ctx.config.preflight {
            preflight::run_preflight_checks(ctx.program(), &ctx.config);
        }
    } else {
        debug!("Crash boundary already entered, keeping the existing context");
    }

    signals::install()?;
    Ok(ctx)
}

/// Run `body`, turning an error into a report and a failed exit
///
/// The error is usually a [`CriticalError`](crate::CriticalError), or an
/// application error that `critical!` converted one into through
/// `From<CriticalError>`. Does not install anything; see [`enter`].
pub fn guard<T, E, F>(body: F) -> T
where
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    match body() {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{err}");
            process::exit(libc::EXIT_FAILURE);
        }
    }
}

/// Enter the boundary with `FAULTLINE_*` settings and run `body` inside it
pub fn run<T, E, F>(program: Option<ProgramIdentity>, body: F) -> T
where
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    run_with(Config::from_env(), program, body)
}

/// [`run`] with an explicit configuration
pub fn run_with<T, E, F>(config: Config, program: Option<ProgramIdentity>, body: F) -> T
where
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    if let Err(e) = enter(config, program) {
        warn!("Fatal signals will not be reported: {e}");
    }
    guard(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critical::CriticalError;

    #[test]
    fn test_guard_passes_value_through() {
        let value = guard(|| Ok::<_, CriticalError>(42));
        assert_eq!(value, 42);
    }

    #[derive(Debug)]
    enum AppError {
        Critical(CriticalError),
    }

    impl fmt::Display for AppError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                AppError::Critical(err) => write!(f, "{err}"),
            }
        }
    }

    impl From<CriticalError> for AppError {
        fn from(err: CriticalError) -> Self {
            AppError::Critical(err)
        }
    }

    fn checked_half(value: u32) -> Result<u32, AppError> {
        if value % 2 == 1 {
            crate::critical!("{value} is odd");
        }
        Ok(value / 2)
    }

    #[test]
    fn test_guard_accepts_converted_errors() {
        assert_eq!(guard(|| checked_half(8)), 4);
        let AppError::Critical(err) = checked_half(3).unwrap_err();
        assert_eq!(err.message(), "3 is odd");
    }

    #[test]
    fn test_context_without_identity_has_no_layout() {
        let ctx = CrashContext::new(Config::default(), None);
        assert!(ctx.program().is_none());
        assert!(ctx.layout().is_none());
        assert_eq!(ctx.resolver().tool(), Config::default().tool.as_path());
    }
}
