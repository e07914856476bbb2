//! Structured logging.
//!
//! # Responsibilities
//! - Install the process-wide tracing subscriber
//! - Keep the most recent log lines in memory for the `/logs` page
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured `log_filter`
//! - The in-memory buffer is bounded and drops the oldest lines first

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ProcessConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("cannot install log subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Bounded ring of formatted log lines.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<Ring>>,
}

#[derive(Debug)]
struct Ring {
    lines: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Ring {
                lines: VecDeque::with_capacity(capacity),
                capacity,
                partial: String::new(),
            })),
        }
    }

    /// The buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        let ring = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        ring.lines.iter().cloned().collect()
    }

    fn append(&self, bytes: &[u8]) {
        let mut ring = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        ring.partial.push_str(&String::from_utf8_lossy(bytes));
        while let Some(pos) = ring.partial.find('\n') {
            let line: String = ring.partial.drain(..=pos).collect();
            let line = line.trim_end().to_string();
            if ring.lines.len() == ring.capacity {
                ring.lines.pop_front();
            }
            ring.lines.push_back(line);
        }
    }
}

/// Writer handed out to the fmt layer for each event.
pub struct LogBufferWriter {
    buffer: LogBuffer,
}

impl io::Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            buffer: self.clone(),
        }
    }
}

/// Install the global subscriber: stderr output plus the in-memory buffer.
pub fn init(config: &ProcessConfig) -> Result<LogBuffer, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)?,
    };
    let buffer = LogBuffer::new(config.log_buffer_lines);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(buffer.clone()),
        )
        .try_init()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn splits_writes_into_lines() {
        let buffer = LogBuffer::new(8);
        let mut writer = buffer.make_writer();
        writer.write_all(b"first line\nsecond ").unwrap();
        writer.write_all(b"line\n").unwrap();

        assert_eq!(buffer.lines(), vec!["first line", "second line"]);
    }

    #[test]
    fn drops_oldest_lines_when_full() {
        let buffer = LogBuffer::new(2);
        let mut writer = buffer.make_writer();
        writer.write_all(b"a\nb\nc\n").unwrap();

        assert_eq!(buffer.lines(), vec!["b", "c"]);
    }
}
