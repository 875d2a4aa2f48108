//! # keelson
//!
//! The engine room underneath a connection-oriented server: a readiness
//! poller, a fixed worker pool, a per-connection deadline heap, growable
//! staging buffers, and an async logger built from the same parts.
//!
//! This facade re-exports `keelson-core` (platform-agnostic primitives)
//! and `keelson-runtime` (epoll, fd I/O, logging, config). Protocol
//! parsing, accept-loop policy, and connection bookkeeping stay with the
//! caller; `cmd/echo` in this repository shows one way to wire it all
//! together.

pub use keelson_core::{
    buffer, buffer::Buffer, deque, deque::BlockingDeque, env, error::CoreError, pool,
    pool::ThreadPool, timer, timer::HeapTimer, timer::TimerId,
};

pub use keelson_runtime::{
    config, config::EngineConfig, error::RuntimeError, logger, logger::LogConfig,
    logger::LogLevel, logger::Logger,
};

#[cfg(target_os = "linux")]
pub use keelson_runtime::{EpollFlags, Poller, Registry};

#[cfg(unix)]
pub use keelson_runtime::{BufferIo, IoStatus};

// Logging macros live in keelson-runtime; surface them here too.
pub use keelson_runtime::{log_base, log_debug, log_error, log_info, log_warn};
