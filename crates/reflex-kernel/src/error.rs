//! Error taxonomy.
//!
//! Only [`StartupError`] is fatal. Everything raised while handling an
//! individual event stays inside that event's task.

use std::path::PathBuf;

use reflex_core::ConfigError;

use crate::kernel::{Channel, TaskId};

/// A model artifact could not be turned into a handle.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact {path} not found")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read model artifact {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact {path} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("model artifact {path} rejected: {reason}")]
    Rejected { path: PathBuf, reason: String },
}

impl ModelLoadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Missing { path, .. }
            | Self::Unreadable { path, .. }
            | Self::Malformed { path, .. }
            | Self::Rejected { path, .. } => path,
        }
    }
}

/// A single prediction failed. Always mapped to `idle`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    #[error("empty model input")]
    EmptyInput,

    #[error("inference backend failed: {0}")]
    Backend(String),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}

/// An event could not be queued as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("pending queue full ({capacity}); dropped oldest task {dropped}")]
    Overflow { dropped: TaskId, capacity: usize },

    #[error("dispatcher is shut down")]
    Closed,

    #[error("channel {0} is disabled")]
    ChannelDisabled(Channel),
}

/// An operator command could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),
}

/// Activation failed; the agent never started.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelLoadError),
}

impl StartupError {
    /// One-line message for the world's notification channel.
    pub fn notice(&self) -> String {
        format!("Reflex agent failed to start: {self}")
    }
}
