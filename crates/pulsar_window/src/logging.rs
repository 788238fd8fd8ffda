//! Logging setup for windowed applications
//
// Call `logging::init` at the start of main() and keep the returned guard
// alive until exit. Filtering follows RUST_LOG when set.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::Local;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,pulsar_window=debug";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Colored console output.
    pub verbose: bool,
    /// Directory for timestamped log folders. No file log when unset.
    pub log_dir: Option<PathBuf>,
}

/// Flushes the file log when dropped.
#[must_use = "file logging stops when the guard is dropped"]
pub struct LogGuard(#[allow(dead_code)] Option<tracing_appender::non_blocking::WorkerGuard>);

/// Install the global subscriber. A second call leaves the first subscriber
/// in place.
pub fn init(options: &LogOptions) -> LogGuard {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match options.log_dir.as_ref().and_then(|dir| open_log_file(dir)) {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let console_layer = options.verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .event_format(ConsoleFormatter)
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
    LogGuard(guard)
}

fn open_log_file(dir: &std::path::Path) -> Option<std::fs::File> {
    let folder = dir.join(Local::now().format("%Y-%m-%d_%H-%M-%S").to_string());
    if let Err(e) = std::fs::create_dir_all(&folder) {
        eprintln!("failed to create log folder {}: {e}", folder.display());
        return None;
    }
    let path = folder.join("window.log");
    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("failed to open {}: {e}", path.display());
            None
        }
    }
}

/// Colored single-line console output: time, level, thread, target, message
/// and then the structured fields.
pub struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let (level, color) = match *meta.level() {
            tracing::Level::ERROR => ("ERROR", "\x1b[1;91m"),
            tracing::Level::WARN => ("WARN ", "\x1b[1;93m"),
            tracing::Level::INFO => ("INFO ", "\x1b[1;94m"),
            tracing::Level::DEBUG => ("DEBUG", "\x1b[1;92m"),
            tracing::Level::TRACE => ("TRACE", "\x1b[1;95m"),
        };
        write!(writer, "\x1b[2;36m{}\x1b[0m ", Local::now().format("%H:%M:%S%.3f"))?;
        write!(writer, "{color}{level}\x1b[0m ")?;
        let thread = std::thread::current();
        write!(writer, "\x1b[2;35m[{}]\x1b[0m ", thread.name().unwrap_or("?"))?;
        write!(writer, "\x1b[2;33m{}\x1b[0m: ", meta.target())?;

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        write!(writer, "{}", visitor.message)?;
        for (name, value) in &visitor.fields {
            write!(writer, " \x1b[2m{name}=\x1b[0m{value}")?;
        }
        writeln!(writer)
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl tracing_subscriber::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.fields.push((field.name(), value.to_owned()));
        }
    }
}
