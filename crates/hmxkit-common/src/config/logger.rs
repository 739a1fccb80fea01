use super::{GlobalConfig, matmul::MatmulLogLevel};
use core::fmt::Display;
use hashbrown::HashMap;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

/// Configuration for logging in hmxkit, parameterized by a log level type.
///
/// Note that you can use multiple loggers at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional crate-level logging configuration (e.g., info, debug, trace).
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in `LoggerConfig`.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
    /// Whether this level turns the logger off.
    fn is_disabled(&self) -> bool;
}

/// Binary log level for enabling or disabling logging.
#[derive(Default, Copy, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum BinaryLogLevel {
    /// Logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Logging is fully enabled.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for BinaryLogLevel {
    fn is_disabled(&self) -> bool {
        matches!(self, BinaryLogLevel::Disabled)
    }
}

/// Central logging utility for hmxkit, managing multiple log outputs.
///
/// Outputs shared between the matmul and transcode settings are opened once.
#[derive(Debug)]
pub struct Logger {
    loggers: Vec<LoggerKind>,
    matmul_index: Vec<usize>,
    transcode_index: Vec<usize>,
    /// Global configuration the loggers were built from.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Hash, PartialEq, Eq)]
enum LoggerId {
    File(PathBuf),
    Stdout,
    Stderr,
    LogCrate(LogCrateLevel),
}

impl Logger {
    /// Creates a new `Logger` based on the global configuration.
    ///
    /// Note that creating a logger opens the configured files, create one per multiply call at
    /// most.
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Creates a new `Logger` from an explicit configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let mut loggers = Vec::new();
        let mut matmul_index = Vec::new();
        let mut transcode_index = Vec::new();
        let mut logger2index = HashMap::<LoggerId, usize>::new();

        register_logger(
            &config.matmul.logger,
            &mut matmul_index,
            &mut loggers,
            &mut logger2index,
        );
        register_logger(
            &config.transcode.logger,
            &mut transcode_index,
            &mut loggers,
            &mut logger2index,
        );

        Self {
            loggers,
            matmul_index,
            transcode_index,
            config,
        }
    }

    /// Logs a message for matrix multiplications, directing it to all configured matmul loggers.
    pub fn log_matmul<S: Display>(&mut self, msg: &S) {
        Self::log_all(&mut self.loggers, &self.matmul_index, msg);
    }

    /// Logs a message for layout transcoding, directing it to all configured transcode loggers.
    pub fn log_transcode<S: Display>(&mut self, msg: &S) {
        Self::log_all(&mut self.loggers, &self.transcode_index, msg);
    }

    /// Returns the current matmul log level.
    pub fn log_level_matmul(&self) -> MatmulLogLevel {
        self.config.matmul.logger.level
    }

    /// Returns the current transcode log level.
    pub fn log_level_transcode(&self) -> BinaryLogLevel {
        self.config.transcode.logger.level
    }

    fn log_all<S: Display>(loggers: &mut [LoggerKind], indices: &[usize], msg: &S) {
        if indices.len() > 1 {
            let msg = msg.to_string();
            for index in indices {
                loggers[*index].log(&msg);
            }
        } else if let Some(index) = indices.first() {
            loggers[*index].log(msg);
        }
    }
}

fn register_logger<L: LogLevel>(
    kind: &LoggerConfig<L>,
    setting_index: &mut Vec<usize>,
    loggers: &mut Vec<LoggerKind>,
    logger2index: &mut HashMap<LoggerId, usize>,
) {
    if kind.level.is_disabled() {
        return;
    }

    let mut push = |id: LoggerId, make: &dyn Fn() -> Option<LoggerKind>| {
        if let Some(index) = logger2index.get(&id) {
            setting_index.push(*index);
        } else if let Some(logger) = make() {
            let index = loggers.len();
            logger2index.insert(id, index);
            loggers.push(logger);
            setting_index.push(index);
        }
    };

    if let Some(file) = &kind.file {
        push(LoggerId::File(file.clone()), &|| {
            FileLogger::new(file, kind.append).map(LoggerKind::File)
        });
    }

    if kind.stdout {
        push(LoggerId::Stdout, &|| Some(LoggerKind::Stdout));
    }

    if kind.stderr {
        push(LoggerId::Stderr, &|| Some(LoggerKind::Stderr));
    }

    if let Some(level) = kind.log {
        push(LoggerId::LogCrate(level), &|| Some(LoggerKind::Log(level)));
    }
}

/// Represents different types of loggers.
#[derive(Debug)]
enum LoggerKind {
    /// Logs to a file.
    File(FileLogger),

    /// Logs to standard output.
    Stdout,

    /// Logs to standard error.
    Stderr,

    /// Logs using the `log` crate with a specified level.
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

/// Logger that writes messages to a file.
#[derive(Debug)]
struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    // A file that can't be opened disables this output instead of failing the multiply.
    fn new(path: &PathBuf, append: bool) -> Option<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path);

        match file {
            Ok(file) => Some(Self {
                writer: BufWriter::new(file),
            }),
            Err(err) => {
                log::warn!("Can't open log file {}: {err}", path.display());
                None
            }
        }
    }

    fn log<S: Display>(&mut self, msg: &S) {
        let written = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());
        if let Err(err) = written {
            log::warn!("Can't write to log file: {err}");
        }
    }
}
