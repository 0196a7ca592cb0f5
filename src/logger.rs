//! Non-blocking `log` backend.
//!
//! Log macros are called from the tick, so `log()` only formats the line and
//! hands it to a bounded queue. A writer thread prints queued lines to stderr.
//! When the queue is full the line is dropped and counted. Every accepted
//! line is also kept in a bounded [`DiagnosticLog`] for later inspection.
//!
//! ```ignore
//! let diagnostics = gimbal_stabilizer::logger::init(LevelFilter::Info)?;
//! log::info!("controller running");
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, Sender};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::ipc::shared_resource::DiagnosticLog;

const QUEUE_CAPACITY: usize = 1024;
const HISTORY_CAPACITY: usize = 2000;

pub struct GimbalLogger {
    level: LevelFilter,
    tx: Sender<String>,
    history: DiagnosticLog,
    dropped: AtomicU64,
    started: Instant,
}

impl GimbalLogger {
    /// Builds a logger and the receiving end of its queue. `init` wires the
    /// receiver to a writer thread; tests can drain it directly.
    pub fn new(level: LevelFilter, capacity: usize, history: DiagnosticLog) -> (Self, Receiver<String>) {
        let (tx, rx) = bounded(capacity.max(1));
        let logger = Self {
            level,
            tx,
            history,
            dropped: AtomicU64::new(0),
            started: Instant::now(),
        };
        (logger, rx)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn history(&self) -> &DiagnosticLog {
        &self.history
    }
}

impl log::Log for GimbalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{:9.3}s] {:<5} {} - {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        );

        // full or writer gone: drop rather than block the caller
        if self.tx.try_send(line).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.history.try_write(format!("{} {}", record.level(), record.args()));
    }

    /// Waits briefly for the writer thread to drain the queue.
    fn flush(&self) {
        for _ in 0..100 {
            if self.tx.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

static LOGGER: OnceLock<GimbalLogger> = OnceLock::new();

/// Installs the global logger and starts its writer thread. Returns the
/// diagnostic history shared with the logger.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter) -> Result<DiagnosticLog, SetLoggerError> {
    let history = DiagnosticLog::new(HISTORY_CAPACITY);
    let mut receiver = None;
    let logger = LOGGER.get_or_init(|| {
        let (logger, rx) = GimbalLogger::new(level, QUEUE_CAPACITY, history.clone());
        receiver = Some(rx);
        logger
    });
    log::set_logger(logger).map(|()| log::set_max_level(level))?;

    if let Some(rx) = receiver {
        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let stderr = std::io::stderr();
                for line in rx.iter() {
                    let _ = writeln!(stderr.lock(), "{}", line);
                }
            })
            .ok();
    }
    Ok(logger.history().clone())
}

/// Lines dropped because the queue was full.
pub fn dropped() -> u64 {
    LOGGER.get().map(GimbalLogger::dropped).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};

    fn record<'a>(args: std::fmt::Arguments<'a>) -> Record<'a> {
        Record::builder()
            .args(args)
            .level(Level::Error)
            .target("gimbal_stabilizer::test")
            .build()
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let (logger, rx) = GimbalLogger::new(LevelFilter::Info, 2, DiagnosticLog::new(8));
        for i in 0..5 {
            logger.log(&record(format_args!("line {}", i)));
        }
        assert_eq!(rx.len(), 2);
        assert_eq!(logger.dropped(), 3);
        assert_eq!(logger.history().len(), 2);
    }

    #[test]
    fn test_level_filter() {
        let (logger, rx) = GimbalLogger::new(LevelFilter::Warn, 4, DiagnosticLog::new(4));
        logger.log(
            &Record::builder()
                .args(format_args!("noise"))
                .level(Level::Debug)
                .target("gimbal_stabilizer::test")
                .build(),
        );
        assert!(rx.is_empty());
        assert!(logger.history().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let (logger, rx) = GimbalLogger::new(LevelFilter::Info, 16, DiagnosticLog::new(3));
        for i in 0..6 {
            logger.log(&record(format_args!("line {}", i)));
        }
        let lines = logger.history().read_all();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("line 5"));
        assert_eq!(rx.len(), 6);
    }
}
