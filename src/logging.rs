//! File-backed sink for the `log` facade.
//!
//! The terminal front end owns stdout and stderr while the alternate screen
//! is up, so engine logs go to a file instead. Without a call to
//! [`init_log_file`] every `log` macro is a no-op.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use log::{LevelFilter, Log, Metadata, Record};

struct FileLogger {
    level: LevelFilter,
    file: Mutex<File>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(
                file,
                "{} {:<5} {}: {}",
                millis,
                record.level(),
                record.target(),
                record.args()
            );
            let _ = file.flush();
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Truncates `path` and installs it as the process-wide log sink.
///
/// Fails if the file cannot be created or a logger is already installed.
pub fn init_log_file(path: &Path, level: LevelFilter) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let logger = FileLogger {
        level,
        file: Mutex::new(file),
    };

    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow!("failed to install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}
