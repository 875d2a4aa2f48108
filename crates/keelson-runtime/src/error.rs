//! Runtime error types.

use std::fmt;

use keelson_core::CoreError;

#[derive(Debug)]
pub enum RuntimeError {
    /// OS error with errno (poller and socket paths).
    Os(i32),
    /// Filesystem failure (log file open/create).
    Io(std::io::Error),
    /// A core primitive reported a contract violation.
    Core(CoreError),
    /// Configuration rejected by `validate()`.
    InvalidConfig(&'static str),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Os(e) => write!(f, "OS error: errno {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Core(e) => write!(f, "{}", e),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CoreError> for RuntimeError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

#[cfg(unix)]
impl From<nix::errno::Errno> for RuntimeError {
    fn from(e: nix::errno::Errno) -> Self {
        Self::Os(e as i32)
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
