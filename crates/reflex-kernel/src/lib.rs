//! Reflex Kernel - event-driven inference runtime
//!
//! This crate turns world events into model decisions: it captures a
//! snapshot per event, runs encode + predict on a bounded worker pool
//! against a hot-swappable model, and funnels the resolved actions to a
//! single mutation context that applies them in arrival order.

pub mod agent;
pub mod commands;
pub mod config;
pub mod error;
pub mod kernel;
pub mod model;
pub mod observability;
pub mod watch;

pub use agent::Agent;
pub use commands::{Command, CommandHandler, CommandReply};
pub use config::AgentConfig;
pub use error::{CommandError, DispatchError, InferenceError, ModelLoadError, StartupError};
pub use kernel::{Applied, Applier, Channel, Dispatcher, TaskId, TaskState};
pub use model::{ArtifactLoader, Model, ModelAdapter, ModelHandle, ModelLoader};
pub use observability::{DecisionLog, DecisionRecord, DispatchStats, StatsSnapshot};
