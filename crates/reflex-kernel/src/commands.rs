//! Operator commands - `reload` and `status`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::CommandError;
use crate::model::ModelAdapter;

pub const RELOAD_OK: &str = "Model reloaded successfully.";
pub const RELOAD_FAILED: &str = "Failed to reload model.";
pub const STATUS_RUNNING: &str = "Reinforcement Learning Plugin is running.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reload the model, from the configured path when none is given.
    Reload(Option<PathBuf>),
    Status,
}

impl Command {
    /// Parse a console line such as `reload models/v2.json` or `::rl_status`.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let line = line.strip_prefix("::").unwrap_or(line).trim_start();

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        if name.is_empty() {
            return Err(CommandError::Empty);
        }

        match name.to_lowercase().as_str() {
            "reload" | "rl_reload" => {
                Ok(Command::Reload((!arg.is_empty()).then(|| PathBuf::from(arg))))
            }
            "status" | "rl_status" => Ok(Command::Status),
            _ => Err(CommandError::Unknown(name.to_string())),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Outcome of one command, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub ok: bool,
    pub message: String,
}

impl CommandReply {
    fn ok(message: &str) -> Self {
        Self {
            ok: true,
            message: message.to_string(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Executes commands and announces their replies on the world's
/// notification channel.
///
/// `run` may block on model loading; call it from a console or watcher
/// thread, not from the mutation context.
#[derive(Clone)]
pub struct CommandHandler {
    models: Arc<ModelAdapter>,
    default_model: PathBuf,
    notices: mpsc::UnboundedSender<String>,
}

impl CommandHandler {
    pub(crate) fn new(
        models: Arc<ModelAdapter>,
        default_model: &Path,
        notices: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            models,
            default_model: default_model.to_path_buf(),
            notices,
        }
    }

    /// Parse and run a console line. Unparseable lines change nothing and
    /// are not announced.
    pub fn execute(&self, line: &str) -> CommandReply {
        match Command::parse(line) {
            Ok(command) => self.run(command),
            Err(e) => CommandReply::failed(e.to_string()),
        }
    }

    pub fn run(&self, command: Command) -> CommandReply {
        let reply = match command {
            Command::Reload(path) => {
                let path = path.unwrap_or_else(|| self.default_model.clone());
                match self.models.reload(&path) {
                    Ok(_) => CommandReply::ok(RELOAD_OK),
                    Err(_) => CommandReply::failed(RELOAD_FAILED),
                }
            }
            Command::Status => CommandReply::ok(STATUS_RUNNING),
        };

        self.announce(&reply.message);
        reply
    }

    fn announce(&self, message: &str) {
        if self.notices.send(message.to_string()).is_err() {
            tracing::warn!(message, "Notice not delivered, applier is gone");
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_aliases_and_prefix() {
        assert_eq!(Command::parse("status"), Ok(Command::Status));
        assert_eq!(Command::parse("::rl_status"), Ok(Command::Status));
        assert_eq!(Command::parse("  RELOAD  "), Ok(Command::Reload(None)));
        assert_eq!(
            Command::parse(":: rl_reload models/v2.json "),
            Ok(Command::Reload(Some(PathBuf::from("models/v2.json"))))
        );
        assert_eq!(
            "reload /tmp/model with spaces.json".parse::<Command>(),
            Ok(Command::Reload(Some(PathBuf::from("/tmp/model with spaces.json"))))
        );
    }

    #[test]
    fn replies_keep_the_host_wording() {
        assert_eq!(RELOAD_OK, "Model reloaded successfully.");
        assert_eq!(RELOAD_FAILED, "Failed to reload model.");
        assert_eq!(STATUS_RUNNING, "Reinforcement Learning Plugin is running.");
    }

    #[test]
    fn rejects_empty_and_unknown() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(Command::parse("::"), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("train now"),
            Err(CommandError::Unknown("train".into()))
        );
    }
}
