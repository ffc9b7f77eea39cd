//! Pending tasks - one event, one inference, one application.

use std::fmt;
use std::sync::Arc;

use reflex_core::{
    encode_message, encode_snapshot, ActionId, ActionName, EncodedInput, WorldSnapshot,
};
use serde::{Deserialize, Serialize};

/// Monotonic task identifier, unique per dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Independent sources of world events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Chat,
    Tick,
    Movement,
    Death,
    Inventory,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Chat,
        Channel::Tick,
        Channel::Movement,
        Channel::Death,
        Channel::Inventory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Tick => "tick",
            Self::Movement => "movement",
            Self::Death => "death",
            Self::Inventory => "inventory",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of a task.
///
/// `Idle → Encoding → Inferring → Applying → Idle`. `Cancelled` is reachable
/// from every state before `Applying`; once application starts it runs to
/// completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Idle,
    Encoding,
    Inferring,
    Applying,
    Cancelled,
}

impl TaskState {
    pub fn can_advance_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Idle, Encoding)
                | (Encoding, Inferring)
                | (Inferring, Applying)
                | (Applying, Idle)
                | (Idle | Encoding | Inferring, Cancelled)
        )
    }

    pub fn is_cancellable(self) -> bool {
        self.can_advance_to(TaskState::Cancelled)
    }
}

/// A dispatched event and the world facts captured with it.
///
/// Owned by exactly one stage of the pipeline at a time and never cloned, so
/// its result can only be delivered once.
#[derive(Debug)]
pub struct PendingTask {
    id: TaskId,
    channel: Channel,
    message: Option<String>,
    snapshot: Arc<WorldSnapshot>,
    state: TaskState,
}

impl PendingTask {
    pub(crate) fn new(
        id: TaskId,
        channel: Channel,
        message: Option<String>,
        snapshot: WorldSnapshot,
    ) -> Self {
        Self {
            id,
            channel,
            message,
            snapshot: Arc::new(snapshot),
            state: TaskState::Idle,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The snapshot captured at dispatch time.
    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Model input: the chat message when there is one, else the snapshot.
    pub fn encode(&self) -> EncodedInput {
        match &self.message {
            Some(message) => encode_message(message),
            None => encode_snapshot(&self.snapshot),
        }
    }

    pub(crate) fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "task {} cannot go from {:?} to {:?}",
            self.id,
            self.state,
            next
        );
        tracing::trace!(task_id = %self.id, from = ?self.state, to = ?next, "task state");
        self.state = next;
    }

    /// Cancel unless application already started. Returns whether it did.
    pub(crate) fn cancel(&mut self) -> bool {
        if self.state.is_cancellable() {
            self.advance(TaskState::Cancelled);
            true
        } else {
            false
        }
    }
}

/// A resolved action paired with the task that produced it.
#[derive(Debug)]
pub struct Decision {
    pub task: PendingTask,
    /// Raw model output; `None` when inference failed.
    pub action_id: Option<ActionId>,
    pub action: ActionName,
    /// Generation of the model handle that produced the output.
    pub generation: u64,
}
