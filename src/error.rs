use burn::{config::ConfigError, record::RecorderError};
use std::{fmt, path::PathBuf};

/// All errors the solvers can surface.
#[derive(Debug)]
pub enum Error {
    /// The adjacency matrix could not be used as a graph.
    InvalidGraph(String),
    /// Instance data for the contraction baseline has the wrong shape.
    InvalidInstance(String),
    /// Hyperparameters that cannot drive a run.
    InvalidConfig(String),
    /// A config file could not be read or parsed.
    Config(ConfigError),
    /// Reading a `.npy` file failed.
    Npy {
        path: PathBuf,
        source: ndarray_npy::ReadNpyError,
    },
    /// Saving or loading a checkpoint failed.
    Checkpoint(RecorderError),
    Json(serde_json::Error),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGraph(msg) => write!(f, "invalid graph: {msg}"),
            Self::InvalidInstance(msg) => write!(f, "invalid instance data: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::Npy { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Self::Checkpoint(e) => write!(f, "checkpoint error: {e:?}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Npy { source, .. } => Some(source),
            Self::Json(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<RecorderError> for Error {
    fn from(e: RecorderError) -> Self {
        Self::Checkpoint(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
