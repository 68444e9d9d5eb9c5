//! CLI error type.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;

use fogmap::config::ConfigError;
use fogmap::overlay::OverlayError;
use fogmap::store::StoreError;
use fogmap::tracker::TrackerError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad configuration key or value.
    Config(String),
    /// The region database could not be used.
    Store(StoreError),
    /// A fix could not be tracked.
    Tracker(TrackerError),
    /// Invalid viewport arguments.
    Overlay(OverlayError),
    /// Malformed line in a replay file.
    Replay { line: usize, message: String },
    /// Reading an input file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The async runtime could not be started.
    Runtime(String),
    /// Output serialization failed.
    Json(serde_json::Error),
    /// A destructive command was run without confirmation.
    NotConfirmed(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Config(_) | CliError::Overlay(_) | CliError::NotConfirmed(_) => {
                ExitCode::from(2)
            }
            _ => ExitCode::FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Store(e) => write!(f, "Region store error: {}", e),
            CliError::Tracker(e) => write!(f, "{}", e),
            CliError::Overlay(e) => write!(f, "Invalid viewport: {}", e),
            CliError::Replay { line, message } => {
                write!(f, "Replay file line {}: {}", line, message)
            }
            CliError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            CliError::Runtime(msg) => write!(f, "Failed to start runtime: {}", msg),
            CliError::Json(e) => write!(f, "Failed to encode JSON: {}", e),
            CliError::NotConfirmed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Store(e) => Some(e),
            CliError::Tracker(e) => Some(e),
            CliError::Overlay(e) => Some(e),
            CliError::Io { source, .. } => Some(source),
            CliError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<TrackerError> for CliError {
    fn from(e: TrackerError) -> Self {
        CliError::Tracker(e)
    }
}

impl From<OverlayError> for CliError {
    fn from(e: OverlayError) -> Self {
        CliError::Overlay(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}
