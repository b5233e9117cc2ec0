//! Command-line definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::Diagnostic;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Successful run (or the command's own exit code)
pub const EXIT_OK: u8 = 0;
/// CLI, configuration or request error
pub const EXIT_CLI: u8 = 2;
/// Client throttled; try again later (EX_TEMPFAIL)
pub const EXIT_RATE_LIMITED: u8 = 75;
/// Store unreachable (EX_UNAVAILABLE)
pub const EXIT_UNAVAILABLE: u8 = 69;

/// CLI-specific errors
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// An argument could not be interpreted
    #[error("Invalid argument: {message}")]
    #[diagnostic(code(cannon::cli::argument))]
    Argument {
        /// What is wrong
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A local input file could not be read
    #[error("Failed to read {path}: {message}")]
    #[diagnostic(code(cannon::cli::input))]
    Input {
        /// File that was being read
        path: String,
        /// Underlying error
        message: String,
    },
}

impl CliError {
    /// Create an argument error with help text
    #[must_use]
    pub fn argument_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Run code through the cannon cache and rate limiter
#[derive(Parser, Debug)]
#[command(name = "cannon", version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        default_value = "warn",
        value_enum,
        help = "Set logging level"
    )]
    pub level: LogLevel,

    /// Emit JSON output and JSON logs.
    #[arg(long, global = true, help = "Emit JSON output and JSON logs")]
    pub json: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a request, replaying a cached result when one exists
    Run(RunArgs),
    /// Print a request's fingerprint without touching the store
    Fingerprint(RequestArgs),
}

/// Arguments describing one execution request
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Runtime: rust, go or maelstrom-go
    #[arg(short = 'r', long, default_value = "rust")]
    pub runtime: String,

    /// File to send, as REMOTE=LOCAL (or just LOCAL to keep its path)
    #[arg(short = 'f', long = "file", value_name = "REMOTE=LOCAL")]
    pub files: Vec<FileArg>,

    /// Shell command; the runtime default when omitted
    #[arg(short = 'c', long)]
    pub command: Option<String>,

    /// Read the whole request from a JSON body instead
    #[arg(long, value_name = "PATH", conflicts_with_all = ["files", "command"])]
    pub request: Option<PathBuf>,
}

/// Arguments for `cannon run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// The request to run
    #[command(flatten)]
    pub request: RequestArgs,

    /// Client identity used for rate limiting
    #[arg(long, env = "CANNON_CLIENT", default_value = "local")]
    pub client: String,

    /// Skip the cache lookup and always execute
    #[arg(long)]
    pub no_cache: bool,

    /// Gateway configuration file (TOML)
    #[arg(long, env = "CANNON_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// A `--file` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    /// Path inside the request
    pub remote: String,
    /// Path on the local machine
    pub local: PathBuf,
}

impl FromStr for FileArg {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (remote, local) = match s.split_once('=') {
            Some((remote, local)) => (remote.trim(), local.trim()),
            None => (s.trim(), s.trim()),
        };
        if remote.is_empty() || local.is_empty() {
            return Err(CliError::argument_with_help(
                format!("invalid file argument '{s}'"),
                "Use --file REMOTE=LOCAL, e.g. --file src/main.rs=./main.rs",
            ));
        }
        Ok(Self {
            remote: remote.to_string(),
            local: PathBuf::from(local),
        })
    }
}

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above
    Info,
    /// Show warnings and above (default)
    Warn,
    /// Show errors only
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
