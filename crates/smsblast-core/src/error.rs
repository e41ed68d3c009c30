use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlastError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("state file {}: {reason}", path.display())]
    StateFile { path: PathBuf, reason: String },

    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BlastError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BlastError::Configuration(msg.into())
    }

    pub(crate) fn state_file(path: &std::path::Path, reason: impl ToString) -> Self {
        BlastError::StateFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BlastError>;
