//! Leveled, timestamped logging with date/size file rotation.
//!
//! One logger instance per process, constructed explicitly and passed by
//! handle (`Arc<Logger>`) to whoever logs. There is no global.
//!
//! Two modes, chosen at [`open`](Logger::open) by the queue capacity:
//!
//! - **sync** (`queue_capacity == 0`): lines are written to the file on
//!   the caller's thread.
//! - **async** (`queue_capacity > 0`): lines are handed to a bounded
//!   [`BlockingDeque`] drained by one dedicated writer thread. A full
//!   queue degrades that call to a synchronous write: never blocks the
//!   caller, never drops the line.
//!
//! Lines are formatted into the logger's own staging [`Buffer`]:
//! fixed-width timestamp, bracketed level tag, message, newline.
//!
//! Rotation closes and reopens the file when the calendar day changes
//! (`YYYY_MM_DD<suffix>`, line counter reset) or when the per-file line
//! budget fills (`YYYY_MM_DD-<n><suffix>`, `n` = completed budget
//! multiples that day).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use time::{OffsetDateTime, UtcOffset};

use keelson_core::{BlockingDeque, Buffer};

use crate::error::Result;

/// Severity, lowest first. A message is written when its level is at or
/// above the logger's threshold.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    /// Unrecognized values default to `Info`, matching the tag fallback.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Debug => "[debug]: ",
            LogLevel::Info => "[info] : ",
            LogLevel::Warn => "[warn] : ",
            LogLevel::Error => "[error]: ",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s.to_lowercase().as_str() {
            "debug" | "0" => Ok(LogLevel::Debug),
            "info" | "1" => Ok(LogLevel::Info),
            "warn" | "2" => Ok(LogLevel::Warn),
            "error" | "3" => Ok(LogLevel::Error),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub directory: PathBuf,
    pub suffix: String,
    /// 0 selects sync mode; > 0 selects async mode with this capacity.
    pub queue_capacity: usize,
    /// Rotate after this many lines in one file.
    pub max_lines_per_file: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            directory: PathBuf::from("./log"),
            suffix: ".log".into(),
            queue_capacity: 1024,
            max_lines_per_file: 50_000,
        }
    }
}

struct LogState {
    file: Option<File>,
    buf: Buffer,
    /// Calendar day the open file belongs to.
    day: u8,
    /// Lines written since the day started.
    line_count: u64,
    directory: PathBuf,
    suffix: String,
    max_lines: u64,
}

pub struct Logger {
    level: AtomicU8,
    open: AtomicBool,
    state: Arc<Mutex<LogState>>,
    queue: Option<Arc<BlockingDeque<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    /// Captured once at open; `time` refuses to probe the local offset
    /// from a multithreaded process.
    offset: UtcOffset,
}

impl Logger {
    /// Open the log destination and, in async mode, start the writer
    /// thread. Failing to open a file here is fatal; there is no logging
    /// without a writable destination.
    pub fn open(config: LogConfig) -> Result<Arc<Self>> {
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        let now = OffsetDateTime::now_utc().to_offset(offset);

        let path = log_file_name(&config.directory, now, None, &config.suffix);
        let file = open_log_file(&path)?;

        let state = Arc::new(Mutex::new(LogState {
            file: Some(file),
            buf: Buffer::new(),
            day: now.day(),
            line_count: 0,
            directory: config.directory,
            suffix: config.suffix,
            max_lines: config.max_lines_per_file.max(1),
        }));

        let queue = if config.queue_capacity > 0 {
            Some(Arc::new(BlockingDeque::new(config.queue_capacity)))
        } else {
            None
        };

        let writer = match &queue {
            Some(q) => {
                let q = Arc::clone(q);
                let state = Arc::clone(&state);
                let handle = thread::Builder::new()
                    .name("keelson-logwriter".into())
                    .spawn(move || writer_loop(q, state))
                    .expect("failed to spawn log writer thread");
                Some(handle)
            }
            None => None,
        };

        Ok(Arc::new(Self {
            level: AtomicU8::new(config.level as u8),
            open: AtomicBool::new(true),
            state,
            queue,
            writer: Mutex::new(writer),
            offset,
        }))
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Lines handed to the async writer but not yet written. Always 0 in
    /// sync mode.
    pub fn pending(&self) -> usize {
        self.queue.as_ref().map_or(0, |q| q.len())
    }

    /// Format one line and dispatch it: rotation check, timestamp +
    /// level tag + message into the staging buffer, then queue hand-off
    /// (async, queue not full) or direct file write.
    pub fn write_log(&self, level: LogLevel, args: std::fmt::Arguments<'_>) {
        if !self.is_open() || level < self.level() {
            return;
        }
        let now = OffsetDateTime::now_utc().to_offset(self.offset);

        let mut state = self.state.lock().unwrap();

        if state.day != now.day()
            || (state.line_count > 0 && state.line_count % state.max_lines == 0)
        {
            self.rotate(&mut state, now);
        }
        state.line_count += 1;

        let _ = write!(
            state.buf,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06} ",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.microsecond()
        );
        state.buf.append(level.tag().as_bytes());
        let _ = state.buf.write_fmt(args);
        state.buf.append(b"\n");

        match &self.queue {
            Some(q) if !q.is_full() => {
                let line = state.buf.drain_to_string();
                // A queue shut down mid-close may reject; the line is
                // abandoned like any other pending item at shutdown.
                let _ = q.push_back(line);
            }
            _ => {
                let state = &mut *state;
                if let Some(file) = state.file.as_mut() {
                    let _ = file.write_all(state.buf.read_slice());
                }
                state.buf.reset();
            }
        }
    }

    /// Wake the background writer (async) and flush the OS file buffer.
    pub fn flush(&self) {
        if let Some(q) = &self.queue {
            q.notify_one_consumer();
        }
        let mut state = self.state.lock().unwrap();
        if let Some(file) = state.file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Drain what the writer can still take, shut the queue down, join
    /// the writer, flush and close the file. Idempotent; also run on
    /// drop.
    pub fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(q) = &self.queue {
            while !q.is_empty() {
                q.notify_one_consumer();
                thread::yield_now();
            }
            q.shutdown();
        }
        if let Some(handle) = self.writer.lock().unwrap().take() {
            let _ = handle.join();
        }
        let mut state = self.state.lock().unwrap();
        if let Some(file) = state.file.as_mut() {
            let _ = file.flush();
        }
        state.file = None;
    }

    /// Close the current file and open the next one. Day changes reset
    /// the line counter; size splits append `-<n>` to the day's name.
    fn rotate(&self, state: &mut LogState, now: OffsetDateTime) {
        let seq = if state.day != now.day() {
            state.day = now.day();
            state.line_count = 0;
            None
        } else {
            Some(state.line_count / state.max_lines)
        };
        let path = log_file_name(&state.directory, now, seq, &state.suffix);

        if let Some(file) = state.file.as_mut() {
            let _ = file.flush();
        }
        // On open failure keep the old file rather than lose lines.
        if let Ok(new_file) = open_log_file(&path) {
            state.file = Some(new_file);
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}

fn log_file_name(
    dir: &Path,
    date: OffsetDateTime,
    seq: Option<u64>,
    suffix: &str,
) -> PathBuf {
    let base = match seq {
        None => format!(
            "{:04}_{:02}_{:02}{}",
            date.year(),
            u8::from(date.month()),
            date.day(),
            suffix
        ),
        Some(n) => format!(
            "{:04}_{:02}_{:02}-{}{}",
            date.year(),
            u8::from(date.month()),
            date.day(),
            n,
            suffix
        ),
    };
    dir.join(base)
}

/// Open for append; if that fails, try creating the directory first.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    match opts.open(path) {
        Ok(f) => Ok(f),
        Err(_) => {
            if let Some(dir) = path.parent() {
                let _ = fs::create_dir_all(dir);
            }
            opts.open(path)
        }
    }
}

fn writer_loop(queue: Arc<BlockingDeque<String>>, state: Arc<Mutex<LogState>>) {
    while let Some(line) = queue.pop_front() {
        let mut state = state.lock().unwrap();
        if let Some(file) = state.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

// ── Macros ────────────────────────────────────────────────────────────

/// Shared guts of the level macros: cheap level/open gate before any
/// formatting happens, flush after each line.
#[macro_export]
macro_rules! log_base {
    ($logger:expr, $level:expr, $($arg:tt)*) => {{
        let logger = &*$logger;
        if logger.is_open() && logger.level() <= $level {
            logger.write_log($level, format_args!($($arg)*));
            logger.flush();
        }
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_base!($logger, $crate::logger::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_base!($logger, $crate::logger::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_base!($logger, $crate::logger::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_base!($logger, $crate::logger::LogLevel::Error, $($arg)*)
    };
}
