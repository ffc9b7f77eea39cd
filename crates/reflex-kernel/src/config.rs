//! Agent configuration loading and management.

use std::path::{Path, PathBuf};

use reflex_core::{ActionCatalog, ActionId, ConfigError, ExecutorConfig, GameAction};
use serde::{Deserialize, Serialize};

use crate::kernel::Channel;

/// Main agent configuration, loaded from .reflex/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Config version
    pub version: Option<String>,

    /// Model artifact settings
    pub model: ModelConfig,

    /// Ordered action id → name table
    #[serde(default = "default_actions")]
    pub actions: Vec<ActionEntry>,

    /// Inference pool and queue bounds
    pub dispatch: DispatchConfig,

    /// Which event channels feed the pipeline
    pub channels: ChannelsConfig,

    /// Announce idle decisions on the notification channel
    #[serde(default = "default_true")]
    pub announce_idle: bool,

    /// JSONL decision log (relative to project root); `null` disables it
    #[serde(default = "default_decision_log")]
    pub decision_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Artifact path (relative to project root)
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Reload automatically when the artifact changes on disk
    pub watch: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            watch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Concurrent inference tasks
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Events waiting for a worker before the oldest is dropped
    #[serde(default = "default_capacity")]
    pub queue_capacity: usize,

    /// Decisions buffered toward the mutation context
    #[serde(default = "default_capacity")]
    pub apply_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_capacity(),
            apply_capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub chat: bool,
    pub tick: bool,
    pub movement: bool,
    pub death: bool,
    pub inventory: bool,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            chat: true,
            tick: true,
            movement: true,
            death: true,
            inventory: true,
        }
    }
}

impl ChannelsConfig {
    pub fn enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Chat => self.chat,
            Channel::Tick => self.tick,
            Channel::Movement => self.movement,
            Channel::Death => self.death,
            Channel::Inventory => self.inventory,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_workers() -> usize {
    2
}
fn default_capacity() -> usize {
    64
}
fn default_model_path() -> PathBuf {
    PathBuf::from("models/policy.json")
}
fn default_decision_log() -> Option<PathBuf> {
    Some(PathBuf::from(".reflex/decisions.jsonl"))
}
fn default_actions() -> Vec<ActionEntry> {
    GameAction::ALL
        .iter()
        .enumerate()
        .map(|(i, action)| ActionEntry {
            id: i as u32,
            name: action.name().to_string(),
        })
        .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: None,
            model: ModelConfig::default(),
            actions: default_actions(),
            dispatch: DispatchConfig::default(),
            channels: ChannelsConfig::default(),
            announce_idle: true,
            decision_log: default_decision_log(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse configuration text; `path` is only used for error reporting
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.catalog()?;
        Ok(config)
    }

    /// Load from project root (looks for .reflex/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config_path = Self::project_config_path(project_root);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(".reflex/config.yaml")
    }

    /// Resolve paths relative to project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        self.model.path = project_root.join(&self.model.path);
        if let Some(log) = self.decision_log.take() {
            self.decision_log = Some(project_root.join(log));
        }
    }

    /// Build the action catalog from the configured table
    pub fn catalog(&self) -> Result<ActionCatalog, ConfigError> {
        ActionCatalog::load(
            self.actions
                .iter()
                .map(|entry| (ActionId(entry.id), entry.name.as_str())),
        )
    }

    pub fn executor(&self) -> ExecutorConfig {
        ExecutorConfig {
            announce_idle: self.announce_idle,
        }
    }
}
