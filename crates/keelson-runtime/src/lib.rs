//! # keelson-runtime
//!
//! Platform-facing layer of the keelson engine:
//!
//! - [`poller::Poller`] — thin epoll readiness wrapper (Linux)
//! - [`sock::BufferIo`] — buffer ↔ fd scatter read / drain write (Unix)
//! - [`logger::Logger`] — sync/async leveled logging with file rotation
//! - [`config::EngineConfig`] — defaults + `KEELSON_*` env overrides
//!
//! The primitives these compose live in `keelson-core`.

pub mod config;
pub mod error;
pub mod logger;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod poller;
        pub use poller::{EpollFlags, Poller, Registry};
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        pub mod sock;
        pub use sock::{BufferIo, IoStatus};
    }
}

pub use config::EngineConfig;
pub use error::{Result, RuntimeError};
pub use logger::{LogConfig, LogLevel, Logger};
