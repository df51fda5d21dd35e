//! Application-raised fatal errors
//!
//! [`critical!`](crate::critical!) prints the stack at its call site and
//! returns a [`CriticalError`] from the enclosing function. The error is
//! meant to travel up with `?` until [`boundary::run`](crate::boundary::run)
//! prints it and exits.

use std::fmt;

/// A fatal error raised by the application, tagged with its call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalError {
    message: String,
    function: &'static str,
    file: &'static str,
    line: u32,
}

impl CriticalError {
    #[must_use]
    pub fn new(message: impl Into<String>, function: &'static str, file: &'static str, line: u32) -> Self {
        Self { message: message.into(), function, file, line }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn function(&self) -> &'static str {
        self.function
    }

    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for CriticalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in {} at {}:{})", self.message, self.function, self.file, self.line)
    }
}

impl std::error::Error for CriticalError {}

/// Reduce a `type_name` path of a nested marker fn to the enclosing
/// function's bare name
///
/// `faultline::crasher::A::foo::f` becomes `foo`; closure segments are
/// dropped first so a call inside a closure reports the outer function.
#[must_use]
pub fn trim_function_path(path: &'static str) -> &'static str {
    let mut path = path.strip_suffix("::f").unwrap_or(path);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// Name of the function the macro is expanded in
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::critical::trim_function_path(type_name_of(f))
    }};
}

/// Print the stack trace and return a [`CriticalError`] built from a
/// format string
///
/// The enclosing function must return a `Result` whose error type
/// implements `From<CriticalError>`.
///
/// ```no_run
/// use faultline::{critical, CriticalError};
///
/// fn load(depth: u32) -> Result<u32, CriticalError> {
///     if depth > 3 {
///         critical!("depth {depth} is out of range");
///     }
///     Ok(depth)
/// }
/// ```
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! critical {
    ($($arg:tt)+) => {{
        $crate::capture::print_stack_trace($crate::capture::CaptureOrigin::Critical);
        return ::core::result::Result::Err(::core::convert::From::from(
            $crate::critical::CriticalError::new(
                ::std::format!($($arg)+),
                $crate::function_name!(),
                ::core::file!(),
                ::core::line!(),
            ),
        ));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CriticalError::new("There has been a critical error !", "main", "main.cpp", 6);
        assert_eq!(err.to_string(), "There has been a critical error ! (in main at main.cpp:6)");
    }

    #[test]
    fn test_trim_function_path() {
        assert_eq!(trim_function_path("faultline::crasher::A::foo::f"), "foo");
        assert_eq!(trim_function_path("demo::main::{{closure}}::f"), "main");
        assert_eq!(trim_function_path("demo::main::{{closure}}::{{closure}}::f"), "main");
        assert_eq!(trim_function_path("main"), "main");
    }

    #[test]
    fn test_function_name_macro() {
        assert_eq!(crate::function_name!(), "test_function_name_macro");
    }

    fn fails(value: u32) -> Result<u32, CriticalError> {
        if value == 0 {
            crate::critical!("value was {}", value);
        }
        Ok(value)
    }

    #[test]
    fn test_critical_returns_error_with_call_site() {
        let err = fails(0).unwrap_err();
        assert_eq!(err.message(), "value was 0");
        assert_eq!(err.function(), "fails");
        assert!(err.file().ends_with("critical.rs"));
        assert!(err.line() > 0);
        assert_eq!(fails(7).unwrap(), 7);
    }

    #[derive(Debug)]
    enum AppError {
        Critical(CriticalError),
    }

    impl From<CriticalError> for AppError {
        fn from(err: CriticalError) -> Self {
            AppError::Critical(err)
        }
    }

    fn fails_into_app_error() -> Result<(), AppError> {
        crate::critical!("wrapped");
    }

    #[test]
    fn test_critical_converts_into_caller_error() {
        let AppError::Critical(err) = fails_into_app_error().unwrap_err();
        assert_eq!(err.message(), "wrapped");
    }
}
