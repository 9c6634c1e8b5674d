//! Logger module
//!
//! Provides leveled logging for the socket factory and the demo server:
//! - Socket construction events (ready sockets, released descriptors)
//! - Server lifecycle logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::{Level, LineFormat, LogRecord};

use std::io;
use std::net::SocketAddr;

use crate::config::LoggingConfig;
use crate::error::Step;
use crate::protocol::Protocol;
use writer::LogWriter;

/// Used until `init()` is called
static FALLBACK: LogWriter = LogWriter::fallback();

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let level: Level = config.level.parse().map_err(invalid_input)?;
    let format: LineFormat = config.format.parse().map_err(invalid_input)?;
    writer::init(LogWriter::new(
        level,
        format,
        config.info_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )?)
}

fn invalid_input(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

fn active() -> &'static LogWriter {
    writer::get().unwrap_or(&FALLBACK)
}

fn emit(level: Level, target: &'static str, message: impl FnOnce() -> String) {
    emit_to(active(), level, target, message);
}

fn emit_to(
    writer: &LogWriter,
    level: Level,
    target: &'static str,
    message: impl FnOnce() -> String,
) {
    if writer.enabled(level) {
        writer.write(&LogRecord::new(level, target, message()));
    }
}

pub fn log_info(message: &str) {
    emit(Level::Info, "demo", || message.to_string());
}

pub fn log_warning(message: &str) {
    emit(Level::Warn, "demo", || message.to_string());
}

pub fn log_error(message: &str) {
    emit(Level::Error, "demo", || message.to_string());
}

pub fn log_backlog_detected(backlog: i32) {
    emit(Level::Debug, "platform", || {
        format!("listen backlog set to {backlog}")
    });
}

pub fn log_socket_ready(protocol: Protocol, local_addr: &SocketAddr, target: &str) {
    emit(Level::Debug, "factory", || {
        format!("{protocol} socket bound on {local_addr} as {target}")
    });
}

/// A descriptor was closed because a later construction step failed.
///
/// The failure itself is reported to the caller; this only records the
/// cleanup.
pub fn log_descriptor_released(step: Step, endpoint: &SocketAddr) {
    descriptor_released(active(), step, endpoint);
}

fn descriptor_released(writer: &LogWriter, step: Step, endpoint: &SocketAddr) {
    emit_to(writer, Level::Debug, "factory", || {
        format!("released socket for {endpoint} after {step} step failed")
    });
}

pub fn log_server_start(protocol: Protocol, addr: &SocketAddr, listeners: usize) {
    emit(Level::Info, "demo", || "======================================".to_string());
    emit(Level::Info, "demo", || {
        format!("reuseport demo started (pid {})", std::process::id())
    });
    emit(Level::Info, "demo", || format!("Protocol: {protocol}"));
    emit(Level::Info, "demo", || format!("Shared address: {addr}"));
    emit(Level::Info, "demo", || format!("Sockets on this address: {listeners}"));
    emit(Level::Info, "demo", || "======================================".to_string());
}

pub fn log_connection_accepted(listener: usize, peer_addr: &SocketAddr) {
    emit(Level::Info, "demo", || {
        format!("[listener {listener}] Accepted from: {peer_addr}")
    });
}

pub fn log_datagram(listener: usize, peer_addr: &SocketAddr, len: usize) {
    emit(Level::Debug, "demo", || {
        format!("[listener {listener}] {len} bytes from {peer_addr}")
    });
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    emit(Level::Error, "demo", || {
        format!("Failed to serve connection: {err:?}")
    });
}

pub fn log_rebind_triggered(addr: &SocketAddr) {
    emit(Level::Info, "demo", || {
        format!("[Rebind] Binding a new socket set on {addr}")
    });
}

pub fn log_rebind_failed(err: &impl std::fmt::Display) {
    emit(Level::Error, "demo", || {
        format!("[Rebind] Failed to bind new sockets: {err}")
    });
    emit(Level::Error, "demo", || {
        "[Rebind] Continuing with current sockets".to_string()
    });
}
