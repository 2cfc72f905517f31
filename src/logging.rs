//! Tracing setup: console output that plays well with progress bars, plus a
//! warnings-and-errors log file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::fetcher::ProgressBoard;

pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Install the global subscriber.
///
/// The log file is truncated. Console verbosity follows `LOG_LEVEL`
/// (default INFO); the file always receives WARN and above.
pub fn init(log_file: &Path, progress: &ProgressBoard) -> Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }
    let file = File::create(log_file)
        .with_context(|| format!("Failed to open log file {:?}", log_file))?;

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(ConsoleWriter::new(progress.clone()))
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var(LOG_LEVEL_ENV)
                .from_env_lossy(),
        );
    let errors = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(console)
        .with(errors)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Writes each event to stdout with the progress bars suspended.
pub struct ConsoleWriter {
    progress: ProgressBoard,
}

impl ConsoleWriter {
    pub fn new(progress: ProgressBoard) -> Self {
        Self { progress }
    }
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = EventBuffer<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        EventBuffer {
            progress: &self.progress,
            buf: Vec::new(),
        }
    }
}

/// Collects one formatted event and prints it on drop.
pub struct EventBuffer<'a> {
    progress: &'a ProgressBoard,
    buf: Vec<u8>,
}

impl Write for EventBuffer<'_> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EventBuffer<'_> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        self.progress.suspend(|| {
            let mut out = io::stdout().lock();
            let _ = out.write_all(&buf);
            let _ = out.flush();
        });
    }
}
