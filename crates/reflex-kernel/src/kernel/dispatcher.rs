//! Dispatcher - turns world events into pending tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reflex_core::{WorldSnapshot, WorldView};

use super::queue::PendingQueue;
use super::task::{Channel, PendingTask, TaskId};
use crate::config::ChannelsConfig;
use crate::error::DispatchError;
use crate::observability::DispatchStats;

/// Entry point for the event-producing context.
///
/// Every hook captures what it needs synchronously and returns without
/// waiting on inference. A full queue sheds its oldest task instead of
/// blocking the caller.
pub struct Dispatcher {
    queue: Arc<PendingQueue>,
    stats: Arc<DispatchStats>,
    channels: ChannelsConfig,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: Arc<PendingQueue>,
        stats: Arc<DispatchStats>,
        channels: ChannelsConfig,
    ) -> Self {
        Self {
            queue,
            stats,
            channels,
            next_id: AtomicU64::new(1),
        }
    }

    /// A chat message arrived. The message is the model input.
    pub fn on_chat_message<V>(&self, message: &str, world: &V) -> Result<TaskId, DispatchError>
    where
        V: WorldView + ?Sized,
    {
        self.dispatch(Channel::Chat, Some(message.to_string()), world.snapshot())
    }

    /// The world advanced one tick.
    pub fn on_game_tick<V: WorldView + ?Sized>(&self, world: &V) -> Result<TaskId, DispatchError> {
        self.dispatch(Channel::Tick, None, world.snapshot())
    }

    /// The local actor changed position.
    pub fn on_player_moved<V: WorldView + ?Sized>(
        &self,
        world: &V,
    ) -> Result<TaskId, DispatchError> {
        self.dispatch(Channel::Movement, None, world.snapshot())
    }

    /// Some actor died.
    pub fn on_actor_death<V: WorldView + ?Sized>(
        &self,
        world: &V,
    ) -> Result<TaskId, DispatchError> {
        self.dispatch(Channel::Death, None, world.snapshot())
    }

    /// An item container (inventory, equipment) changed.
    pub fn on_item_container_changed<V: WorldView + ?Sized>(
        &self,
        world: &V,
    ) -> Result<TaskId, DispatchError> {
        self.dispatch(Channel::Inventory, None, world.snapshot())
    }

    /// Queue one task for `channel` with an already captured snapshot.
    pub fn dispatch(
        &self,
        channel: Channel,
        message: Option<String>,
        snapshot: WorldSnapshot,
    ) -> Result<TaskId, DispatchError> {
        if !self.channels.enabled(channel) {
            return Err(DispatchError::ChannelDisabled(channel));
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let task = PendingTask::new(id, channel, message, snapshot);

        if let Some(mut evicted) = self.queue.push(task)? {
            evicted.cancel();
            self.stats.record_dropped();
            let overflow = DispatchError::Overflow {
                dropped: evicted.id(),
                capacity: self.queue.capacity(),
            };
            tracing::debug!(
                task_id = %evicted.id(),
                channel = %evicted.channel(),
                reason = %overflow,
                "Dropped pending task"
            );
        }

        self.stats.record_dispatched();
        tracing::trace!(task_id = %id, %channel, "Task dispatched");
        Ok(id)
    }

    /// Tasks waiting for a worker right now.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.queue.len())
            .field("capacity", &self.queue.capacity())
            .field("channels", &self.channels)
            .finish()
    }
}
