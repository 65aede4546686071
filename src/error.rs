//! Error types for vote-check.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to compile pattern {name}: {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Repository existence probe errors.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("No repository URL found in message body")]
    NoUrl,

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// Verification process errors.
///
/// The invoker never returns these to the pipeline; they are rendered into
/// the captured output so classification can still run.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("Failed to spawn command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting on command '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Artifact collection errors.
#[derive(Debug, thiserror::Error)]
#[error("Failed to copy {path}: {source}")]
pub struct CollectError {
    /// Path being read or written when the failure occurred.
    pub path: PathBuf,
    /// Destinations successfully written before the failure.
    pub collected: Vec<PathBuf>,
    #[source]
    pub source: std::io::Error,
}

/// Template rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to load template {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Signing key bootstrap errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyImportError {
    #[error("Failed to download keys from {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to write keys to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raw message parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Message could not be parsed")]
    Unparseable,

    #[error("Failed to read message {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Message body does not contain the release check command")]
    MissingCommand,

    #[error("Invalid candidate id {0:?}: expected decimal digits")]
    InvalidCandidateId(String),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}
