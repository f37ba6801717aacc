use crate::error::{CliError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Span;
use tracing_subscriber::{
    Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// A log file records at least this much, whatever the console shows.
const FILE_LEVEL_FLOOR: LevelFilter = LevelFilter::DEBUG;

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let console = console_level(verbosity, quiet);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(console);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(CliError::Io)?;
            registry.with(file_layer(file, file_level(console))).init();
        }
        None => registry.init(),
    }

    Ok(())
}

/// Span wrapping a whole command. Every line the file layer writes while it
/// is entered carries the command name and scenario path, and its closing
/// line records how long the command took.
pub fn scenario_span(command: &'static str, scenario: &Path) -> Span {
    tracing::info_span!("scenario", command, path = %scenario.display())
}

fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn file_level(console: LevelFilter) -> LevelFilter {
    console.max(FILE_LEVEL_FLOOR)
}

fn file_layer<S>(file: File, level: LevelFilter) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(level)
}
