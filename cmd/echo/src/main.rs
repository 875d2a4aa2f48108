//! Keelson Echo Server
//!
//! TCP echo server wiring the whole engine together: the epoll poller
//! drives readiness, the heap timer evicts idle connections, the worker
//! pool runs the per-connection I/O against staging buffers, and
//! everything logs through one async logger.
//!
//! Usage:
//!     cargo run --release -p keelson-echo [port]
//!
//! Test with:
//!     echo "hello" | nc -q1 localhost 9530
//!
//! Configuration comes from KEELSON_* environment variables (see
//! `keelson::EngineConfig`); the port may also be given as argv[1].
//!
//! Structure: the event-loop thread owns the poller's wait side and the
//! timer (the timer is single-owner by contract). Workers and timer
//! callbacks touch epoll only through the clonable registry handle.
//! Connections are re-armed with EPOLLONESHOT, so at most one worker
//! handles a connection at a time.

use std::collections::HashMap;
use std::net::{TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keelson::env::env_get;
use keelson::{
    log_debug, log_error, log_info, log_warn, Buffer, BufferIo, EngineConfig, EpollFlags,
    HeapTimer, IoStatus, Logger, Poller, Registry, ThreadPool,
};

struct Conn {
    stream: TcpStream,
    buf: Buffer,
}

type ConnTable = Arc<Mutex<HashMap<RawFd, Arc<Mutex<Conn>>>>>;

/// Interest mask for every connection: edge-triggered, one worker at a
/// time, peer-close reported.
const CONN_MASK: EpollFlags = EpollFlags::EPOLLIN
    .union(EpollFlags::EPOLLET)
    .union(EpollFlags::EPOLLONESHOT)
    .union(EpollFlags::EPOLLRDHUP);

fn main() {
    if let Err(e) = run() {
        eprintln!("keelson-echo: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), keelson::RuntimeError> {
    let config = EngineConfig::from_env();
    config.validate()?;

    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(|| env_get("KEELSON_PORT", 9530));

    let logger = Logger::open(config.log_config())?;
    log_info!(
        logger,
        "listening on port {} with {} workers, idle timeout {:?}",
        port,
        config.worker_threads,
        config.idle_timeout
    );

    let listener = TcpListener::bind(("0.0.0.0", port))?;
    listener.set_nonblocking(true)?;
    let listen_fd = listener.as_raw_fd();

    let mut poller = Poller::new(config.poller_max_events)?;
    let registry = poller.registry();
    poller.add(listen_fd, EpollFlags::EPOLLIN)?;

    let pool = ThreadPool::new(config.worker_threads);
    let mut timer = HeapTimer::new();
    let conns: ConnTable = Arc::new(Mutex::new(HashMap::new()));

    loop {
        // The expiry pass runs inside next_timeout_ms, so the wait below
        // sleeps exactly until the earliest still-pending deadline.
        let timeout_ms = timer
            .next_timeout_ms()
            .map_or(-1, |ms| ms.min(i32::MAX as u64) as i32);

        let ready = poller.wait(timeout_ms)?;
        for i in 0..ready {
            let (fd, events) = poller.ready(i);

            if fd == listen_fd {
                accept_loop(
                    &listener,
                    &registry,
                    &mut timer,
                    &conns,
                    &logger,
                    config.idle_timeout,
                    config.conn_buffer_size,
                );
            } else if events
                .intersects(EpollFlags::EPOLLRDHUP | EpollFlags::EPOLLHUP | EpollFlags::EPOLLERR)
            {
                // The eviction callback is also the close path.
                timer.trigger(fd as u64);
            } else if events.intersects(EpollFlags::EPOLLIN | EpollFlags::EPOLLOUT) {
                // Activity pushes the idle deadline out; a racing close
                // already removed the entry, which is fine.
                let _ = timer.reschedule(fd as u64, config.idle_timeout);

                let entry = conns.lock().unwrap().get(&fd).cloned();
                if let Some(entry) = entry {
                    let registry = registry.clone();
                    let logger = Arc::clone(&logger);
                    pool.spawn(move || handle_io(fd, entry, registry, logger));
                }
            }
        }
    }
}

/// Drain the accept backlog, registering each new connection with the
/// poller and an idle-eviction timer entry.
fn accept_loop(
    listener: &TcpListener,
    registry: &Registry,
    timer: &mut HeapTimer,
    conns: &ConnTable,
    logger: &Arc<Logger>,
    idle_timeout: Duration,
    buffer_size: usize,
) {
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => {
                log_error!(logger, "accept failed: {}", e);
                break;
            }
        };
        if stream.set_nonblocking(true).is_err() {
            continue;
        }
        let _ = stream.set_nodelay(true);
        let fd = stream.as_raw_fd();

        conns.lock().unwrap().insert(
            fd,
            Arc::new(Mutex::new(Conn {
                stream,
                buf: Buffer::with_capacity(buffer_size),
            })),
        );

        // The callback owns the full close path: deregister, drop the
        // table entry (the fd closes once the last worker lets go of it).
        let close = {
            let conns = Arc::clone(conns);
            let registry = registry.clone();
            let logger = Arc::clone(logger);
            move || {
                let _ = registry.delete(fd);
                if conns.lock().unwrap().remove(&fd).is_some() {
                    log_info!(logger, "fd {} closed", fd);
                }
            }
        };
        timer.schedule(fd as u64, idle_timeout, close);

        if let Err(e) = registry.add(fd, CONN_MASK) {
            log_error!(logger, "register fd {} failed: {}", fd, e);
            timer.trigger(fd as u64);
            continue;
        }
        log_info!(logger, "fd {} connected from {}", fd, peer);
    }
}

/// One worker turn for one connection: read everything available, echo
/// it back, re-arm. Runs with the connection's own lock held and the
/// pool's queue lock released.
fn handle_io(fd: RawFd, entry: Arc<Mutex<Conn>>, registry: Registry, logger: Arc<Logger>) {
    let mut conn = entry.lock().unwrap();
    let Conn { stream, buf } = &mut *conn;

    // Edge-triggered: read until the socket runs dry.
    loop {
        match buf.fill_from_fd(stream.as_fd()) {
            Ok(IoStatus::Transferred(n)) => {
                log_debug!(logger, "fd {} read {} bytes", fd, n);
            }
            Ok(IoStatus::WouldBlock) => break,
            Ok(IoStatus::Closed) => {
                // Re-arm below; EPOLLRDHUP brings the close path around.
                break;
            }
            Err(e) => {
                log_warn!(logger, "fd {} read error: {}", fd, e);
                break;
            }
        }
    }

    // Echo back whatever is staged; leftovers wait for EPOLLOUT.
    while buf.readable_bytes() > 0 {
        match buf.drain_to_fd(stream.as_fd()) {
            Ok(IoStatus::Transferred(_)) => {}
            Ok(IoStatus::WouldBlock) => break,
            Ok(IoStatus::Closed) => break,
            Err(e) => {
                log_warn!(logger, "fd {} write error: {}", fd, e);
                break;
            }
        }
    }

    let mut mask = CONN_MASK;
    if buf.readable_bytes() > 0 {
        mask |= EpollFlags::EPOLLOUT;
    }
    // Fails only when the close path already deregistered the fd.
    if registry.modify(fd, mask).is_err() {
        log_debug!(logger, "fd {} re-arm skipped (already closed)", fd);
    }
}
