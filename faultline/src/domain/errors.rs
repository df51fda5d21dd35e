//! Structured error types for faultline
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Symbol resolution has its own error type next to the resolver, since its
//! failures never leave the stack walker.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaultlineError {
    #[error("Failed to install handler for signal {signal}: {source}")]
    SignalInstall { signal: i32, source: std::io::Error },

    #[error("Failed to set up alternate signal stack: {0}")]
    AltStack(std::io::Error),

    #[error("Failed to read /proc/self/maps: {0}")]
    MemoryMapsParseFailed(String),

    #[error("No memory range found for executable {0}")]
    NoMemoryRangeFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_install_error_display() {
        let err = FaultlineError::SignalInstall {
            signal: 11,
            source: std::io::Error::from_raw_os_error(libc::EINVAL),
        };
        assert!(err.to_string().starts_with("Failed to install handler for signal 11"));
    }

    #[test]
    fn test_no_memory_range_error() {
        let err = FaultlineError::NoMemoryRangeFound("/usr/bin/my-app".to_string());
        assert_eq!(err.to_string(), "No memory range found for executable /usr/bin/my-app");
    }
}
