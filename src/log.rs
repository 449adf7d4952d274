//! Program logger.
//!
//! Messages go to the terminal (warnings and errors on stderr, everything else on stdout) and,
//! when a run has an output folder, to a pair of log files inside it.
use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The environment variable used to set the log level
const LOG_LEVEL_ENV_VAR: &str = "CHIPTRADE_LOG_LEVEL";

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the `CHIPTRADE_LOG_LEVEL`
/// environment variable or the settings.toml file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log file for messages about the ordinary operation of the program
const LOG_INFO_FILE_NAME: &str = "chiptrade_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "chiptrade_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a log level name (case insensitive), e.g. "warn" or "off"
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(log_level.trim())
        .ok()
        .with_context(|| format!("Unknown log level: {log_level}"))
}

/// Pick the log level, with the environment variable taking precedence over settings
fn resolve_log_level(env_value: Option<&str>, from_settings: &str) -> Result<LevelFilter> {
    parse_log_level(env_value.unwrap_or(from_settings))
}

/// Whether a record should be routed to stderr and the error log
fn is_problem(level: Level) -> bool {
    level <= Level::Warn
}

/// Format a log line as `[time level target] message`
fn write_line<T: Display>(out: FormatCallback, level: T, record: &Record, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");
    out.finish(format_args!(
        "[{timestamp} {level} {}] {message}",
        record.target()
    ));
}

/// Dispatcher writing to one terminal stream, coloured if the stream is a terminal
fn terminal_dispatch<W>(
    stream: W,
    is_terminal: bool,
    level: LevelFilter,
    problems: bool,
) -> Dispatch
where
    W: std::io::Write + Send + 'static,
{
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    Dispatch::new()
        .filter(move |metadata| is_problem(metadata.level()) == problems)
        .format(move |out, message, record| {
            if is_terminal {
                write_line(out, colours.color(record.level()), record, message);
            } else {
                write_line(out, record.level(), record, message);
            }
        })
        .level(level)
        .chain(Box::new(stream) as Box<dyn std::io::Write + Send>)
}

/// Dispatcher writing uncoloured lines to a new file in `dir`
fn file_dispatch(
    dir: &Path,
    file_name: &str,
    level: LevelFilter,
    problems: bool,
) -> Result<Dispatch> {
    let file_path = dir.join(file_name);
    let file = File::create(&file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))?;

    Ok(Dispatch::new()
        .filter(move |metadata| is_problem(metadata.level()) == problems)
        .format(|out, message, record| write_line(out, record.level(), record, message))
        .level(level)
        .chain(file))
}

/// Initialise the program logger.
///
/// The level is read from the `CHIPTRADE_LOG_LEVEL` environment variable if set, otherwise from
/// `settings.toml` (`info` by default). Valid levels are `off`, `error`, `warn`, `info`, `debug`
/// and `trace`.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_path`: Folder for log files. If `None`, no log files are written.
pub fn init(log_level_from_settings: &str, log_file_path: Option<&Path>) -> Result<()> {
    let env_value = env::var(LOG_LEVEL_ENV_VAR).ok();
    let log_level = resolve_log_level(env_value.as_deref(), log_level_from_settings)?;

    let mut dispatch = Dispatch::new()
        .chain(terminal_dispatch(
            std::io::stdout(),
            std::io::stdout().is_terminal(),
            log_level,
            false,
        ))
        .chain(terminal_dispatch(
            std::io::stderr(),
            std::io::stderr().is_terminal(),
            log_level.min(LevelFilter::Warn),
            true,
        ));

    if let Some(dir) = log_file_path {
        // Log files always record at least info and warnings, whatever the terminal shows
        dispatch = dispatch
            .chain(file_dispatch(
                dir,
                LOG_INFO_FILE_NAME,
                log_level.max(LevelFilter::Info),
                false,
            )?)
            .chain(file_dispatch(dir, LOG_ERROR_FILE_NAME, LevelFilter::Warn, true)?);
    }

    dispatch.apply()?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}
