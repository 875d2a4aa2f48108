//! Core error types.

use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Cursor or length argument exceeds what the buffer holds.
    OutOfRange { requested: usize, available: usize },
    /// Timer operation requires an id that is not scheduled.
    NotFound(u64),
    /// Operation attempted after the owning queue/pool was shut down.
    Shutdown,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                requested,
                available,
            } => write!(f, "out of range: requested {requested}, available {available}"),
            Self::NotFound(id) => write!(f, "timer id {id} not scheduled"),
            Self::Shutdown => write!(f, "shut down"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;
