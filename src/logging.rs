//! Per-run log sink.
//!
//! Each run appends to `log_<YYYY-MM-DD>.txt` inside a log directory (the
//! binary uses `log/` next to the executable). Nothing here installs a global
//! subscriber: [`RunLog`] hands out a [`tracing::Dispatch`] that the runner
//! attaches to its own future, so the log's lifetime is the run's lifetime.
//!
//! Line format:
//!
//! ```text
//! 16-10-2026 09:14:03,512  INFO pdf2xlsx::runner: PDF file uploaded successfully
//! ```

use chrono::{Local, NaiveDate};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Timestamp layout of log lines (day-first, millisecond precision).
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S,%3f";

/// Name of the log file for `date`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("log_{}.txt", date.format("%Y-%m-%d"))
}

/// A log sink scoped to one conversion run.
#[derive(Clone)]
pub struct RunLog {
    dispatch: Dispatch,
    path: Option<PathBuf>,
}

impl RunLog {
    /// Open today's log file in `log_dir` (created if missing) in append mode.
    ///
    /// `console`, if given, additionally mirrors events to stderr through
    /// that filter.
    pub fn open(log_dir: &Path, level: LevelFilter, console: Option<EnvFilter>) -> io::Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(log_file_name(Local::now().date_naive()));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            dispatch: build_dispatch(Mutex::new(file), level, console),
            path: Some(path),
        })
    }

    /// Log into any writer instead of a file.
    pub fn to_writer<W>(writer: W, level: LevelFilter) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        Self {
            dispatch: build_dispatch(writer, level, None),
            path: None,
        }
    }

    /// Log to stderr only, for when the log directory cannot be opened.
    pub fn console(filter: EnvFilter) -> Self {
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(filter),
        );
        Self {
            dispatch: Dispatch::new(subscriber),
            path: None,
        }
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }

    /// The log file, when logging to one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn build_dispatch<W>(writer: W, level: LevelFilter, console: Option<EnvFilter>) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_filter(level);

    let console_layer = console.map(|filter| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_filter(filter)
    });

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer);
    Dispatch::new(subscriber)
}

/// In-memory log target, for inspecting what a run logged.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
