//! Tracing setup: daily rolling log file, teed into a line channel for an embedding UI.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::kernel::services::adapters::{ensure_log_dir, paths::APP_NAME};
use crate::kernel::services::ports::config::DEFAULT_LOG_FILTER;
use crate::kernel::services::ports::EngineConfig;

const LOG_FILE: &str = "workspace-sync.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is unset or invalid.
    pub filter: String,
    /// Defaults to the application log directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

impl LogConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            filter: config.log_filter.clone(),
            log_dir: None,
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }

    fn resolve_log_dir(&self) -> io::Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => ensure_log_dir().or_else(|_| {
                let dir = std::env::temp_dir().join(APP_NAME).join("logs");
                std::fs::create_dir_all(&dir)?;
                Ok(dir)
            }),
        }
    }
}

pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
    log_rx: Option<Receiver<String>>,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &std::path::Path {
        &self.log_dir
    }

    /// Formatted log lines, one per message. Can be taken once.
    pub fn take_log_rx(&mut self) -> Option<Receiver<String>> {
        self.log_rx.take()
    }
}

/// Buffers one formatted event and sends its lines when dropped.
struct LineWriter {
    buf: Vec<u8>,
    tx: Sender<String>,
}

impl LineWriter {
    fn new(tx: Sender<String>) -> Self {
        Self {
            buf: Vec::with_capacity(256),
            tx,
        }
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        for line in text.lines() {
            let _ = self.tx.send(line.to_string());
        }
    }
}

#[derive(Clone)]
struct TeeMakeWriter {
    file: NonBlocking,
    tx: Sender<String>,
}

struct TeeWriter {
    file: NonBlocking,
    lines: LineWriter,
}

impl<'a> MakeWriter<'a> for TeeMakeWriter {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: self.file.make_writer(),
            lines: LineWriter::new(self.tx.clone()),
        }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        let _ = self.lines.write_all(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.lines.flush()?;
        Ok(())
    }
}

/// Installs the global subscriber. `None` when no log directory is usable or a subscriber is
/// already installed.
pub fn init(config: &LogConfig) -> Option<LoggingGuard> {
    let log_dir = config.resolve_log_dir().ok()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let writer = TeeMakeWriter {
        file: non_blocking,
        tx: log_tx,
    };

    let subscriber = tracing_subscriber::registry().with(config.env_filter()).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "panic");
    }));

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard {
        _guard: guard,
        log_dir,
        log_rx: Some(log_rx),
    })
}

#[cfg(test)]
#[path = "../tests/unit/logging.rs"]
mod tests;
