use std::{
    env, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt::MakeWriter, prelude::*, registry, EnvFilter};

/// File name prefix of the daily log files (`server.<date>.log`).
pub const LOG_FILE_PREFIX: &str = "server";

/// Duplicates every formatted line to a console sink and a file sink.
///
/// A write succeeds if either sink accepted the whole line.
struct Tee<C, F> {
    console: C,
    file: F,
}

impl<C: Write, F: Write> Write for Tee<C, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let console = self.console.write_all(buf);
        let file = self.file.write_all(buf);
        console.or(file).map(|()| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let console = self.console.flush();
        self.file.flush().and(console)
    }
}

#[derive(Clone)]
struct MakeTee<C, F> {
    console: C,
    file: F,
}

impl<'a, C, F> MakeWriter<'a> for MakeTee<C, F>
where
    C: MakeWriter<'a>,
    F: MakeWriter<'a>,
{
    type Writer = Tee<C::Writer, F::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            console: self.console.make_writer(),
            file: self.file.make_writer(),
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

impl LogOutput {
    /// Parses `console`, `file` or `both`; anything else falls back to `both`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => LogOutput::Console,
            "file" => LogOutput::File,
            _ => LogOutput::Both,
        }
    }

    fn uses_console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn uses_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

/// Line format of the emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Human
        }
    }
}

/// Settings for [`init_subscriber`].
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
    pub log_dir: PathBuf,
}

impl LogSettings {
    /// Builds settings for `log_dir`, honouring `LOG_LEVEL`, `LOG_OUTPUT` and
    /// `LOG_FORMAT`. Debug mode lowers the default level to `debug`.
    pub fn from_env(log_dir: impl Into<PathBuf>, debug: bool) -> Self {
        let default_level = if debug { "debug" } else { "info" };
        Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_level.to_string()),
            output: LogOutput::parse(&env::var("LOG_OUTPUT").unwrap_or_default()),
            format: LogFormat::parse(&env::var("LOG_FORMAT").unwrap_or_default()),
            log_dir: log_dir.into(),
        }
    }
}

fn file_appender(log_dir: &Path) -> Option<RollingFileAppender> {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!(
            "Cannot create log directory {}: {e}; logging to stdout only",
            log_dir.display()
        );
        return None;
    }

    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
    {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!(
                "Cannot open log file in {}: {e}; logging to stdout only",
                log_dir.display()
            );
            None
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    for directive in ["tokio=warn", "hyper=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initializes the global tracing subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the process. A log directory that cannot be created degrades to
/// console-only output instead of failing startup.
pub fn init_subscriber(settings: &LogSettings) -> Option<WorkerGuard> {
    let is_json = settings.format == LogFormat::Json;
    let appender = if settings.output.uses_file() {
        file_appender(&settings.log_dir)
    } else {
        None
    };
    let use_console = settings.output.uses_console() || appender.is_none();

    let subscriber = registry().with(env_filter(&settings.level));

    match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            if use_console {
                let tee_writer = MakeTee {
                    console: std::io::stdout,
                    file: non_blocking,
                };
                let fmt_layer = tracing_subscriber::fmt::layer().with_writer(tee_writer);
                if is_json {
                    subscriber.with(fmt_layer.json()).init();
                } else {
                    subscriber.with(fmt_layer.with_ansi(false)).init();
                }
            } else {
                let fmt_layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false);
                if is_json {
                    subscriber.with(fmt_layer.json()).init();
                } else {
                    subscriber.with(fmt_layer).init();
                }
            }
            Some(guard)
        }
        None => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
            if is_json {
                subscriber.with(fmt_layer.json()).init();
            } else {
                subscriber.with(fmt_layer).init();
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_parsing() {
        assert_eq!(LogOutput::parse("console"), LogOutput::Console);
        assert_eq!(LogOutput::parse("FILE"), LogOutput::File);
        assert_eq!(LogOutput::parse("both"), LogOutput::Both);
        assert_eq!(LogOutput::parse(""), LogOutput::Both);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("human"), LogFormat::Human);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Human);
    }

    #[test]
    fn test_tee_writes_to_both_sinks() {
        let mut tee = Tee {
            console: Vec::new(),
            file: Vec::new(),
        };
        tee.write_all(b"hello").unwrap();
        tee.flush().unwrap();
        assert_eq!(tee.console, b"hello");
        assert_eq!(tee.file, b"hello");
    }

    #[test]
    fn test_file_appender_creates_log_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("nested").join("logs");

        assert!(file_appender(&log_dir).is_some());
        assert!(log_dir.is_dir());
    }
}
