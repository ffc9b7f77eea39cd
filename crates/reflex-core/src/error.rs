use std::path::PathBuf;

use crate::ActionId;

/// Configuration is malformed.
///
/// Fatal while activating; a reload that hits this keeps the previous state.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("action id {0} is listed more than once")]
    DuplicateId(ActionId),

    #[error("action id {id} has an empty name")]
    EmptyName { id: ActionId },

    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
