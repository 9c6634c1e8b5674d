//! Log writer module
//!
//! Provides thread-safe log writing to files or stdout/stderr.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use super::format::{Level, LineFormat, LogRecord};

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Write to stderr
    Stderr,
    /// Write to file
    File(Mutex<File>),
}

/// Thread-safe log writer
pub struct LogWriter {
    /// Lowest level that is written
    level: Level,
    format: LineFormat,
    /// Debug and info target
    info: LogTarget,
    /// Warning and error target
    error: LogTarget,
}

impl LogWriter {
    /// Create a new log writer with optional file paths
    pub(super) fn new(
        level: Level,
        format: LineFormat,
        info_log_file: Option<&str>,
        error_log_file: Option<&str>,
    ) -> io::Result<Self> {
        let info = match info_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };

        let error = match error_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stderr,
        };

        Ok(Self {
            level,
            format,
            info,
            error,
        })
    }

    /// Writer used before `init()`: warnings and errors to stderr only
    pub(super) const fn fallback() -> Self {
        Self {
            level: Level::Warn,
            format: LineFormat::Plain,
            info: LogTarget::Stdout,
            error: LogTarget::Stderr,
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    pub fn write(&self, record: &LogRecord) {
        if !self.enabled(record.level) {
            return;
        }
        let line = record.format(self.format);
        match record.level {
            Level::Debug | Level::Info => write_to_target(&self.info, &line),
            Level::Warn | Level::Error => write_to_target(&self.error, &line),
        }
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Write message to log target
fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => {
            println!("{message}");
        }
        LogTarget::Stderr => {
            eprintln!("{message}");
        }
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Initialize the global log writer
///
/// This should be called once at application startup.
/// Returns error if a writer is already installed.
pub fn init(writer: LogWriter) -> io::Result<()> {
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// Get the global log writer, if `init()` has been called
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_target_appends() {
        let dir = std::env::temp_dir().join(format!("reuseport-log-{}", std::process::id()));
        let path = dir.join("nested").join("info.log");
        let path_str = path.to_str().unwrap();

        let writer = LogWriter::new(Level::Debug, LineFormat::Plain, Some(path_str), None).unwrap();
        writer.write(&LogRecord::new(Level::Info, "test", "first".to_string()));
        writer.write(&LogRecord::new(Level::Debug, "test", "second".to_string()));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_level_threshold() {
        let writer = LogWriter::fallback();
        assert!(!writer.enabled(Level::Debug));
        assert!(!writer.enabled(Level::Info));
        assert!(writer.enabled(Level::Warn));
        assert!(writer.enabled(Level::Error));
    }
}
