//! A small hand-rolled `log::Log` implementation rather than a general
//! logging backend: the server only ever needs one line format
//! (`[YYYY.MM.DD HH:MM:SS] LEVEL message`) written either to a file or to
//! stderr, so `env_logger`/`fern`'s configurability buys nothing here.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

enum Sink {
    Stderr,
    File(Mutex<std::fs::File>),
}

pub struct FileLogger {
    sink: Sink,
    level: LevelFilter,
}

impl FileLogger {
    fn new(sink: Sink, level: LevelFilter) -> Self {
        Self { sink, level }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] {:<5} {}\n",
            Local::now().format("%Y.%m.%d %H:%M:%S"),
            record.level(),
            record.args()
        );
        match &self.sink {
            Sink::Stderr => {
                let _ = std::io::stderr().write_all(line.as_bytes());
            }
            Sink::File(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = file.write_all(line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        if let Sink::File(file) = &self.sink {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Installs the process-wide logger. Called once from `main` before the
/// supervisor forks -- each worker inherits the same sink and keeps writing
/// to it (a shared file is opened in append mode, so concurrent workers
/// interleave whole lines rather than corrupting each other's output).
pub fn init(log_file: Option<&Path>, level: LevelFilter) -> Result<(), SetLoggerError> {
    let sink = match log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Sink::File(Mutex::new(file)),
            Err(err) => {
                eprintln!("failed to open log file {}: {}, logging to stderr", path.display(), err);
                Sink::Stderr
            }
        },
        None => Sink::Stderr,
    };

    let logger = Box::new(FileLogger::new(sink, level));
    log::set_boxed_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}
