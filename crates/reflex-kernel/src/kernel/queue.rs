//! Pending queue - bounded, drop-oldest hand-off from producers to workers.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::task::PendingTask;
use crate::error::DispatchError;

#[derive(Debug, Default)]
struct QueueState {
    tasks: VecDeque<PendingTask>,
    closed: bool,
}

/// Bounded FIFO of tasks waiting for an inference worker.
///
/// `push` never blocks: when the queue is full the oldest waiting task is
/// evicted and handed back to the caller.
#[derive(Debug)]
pub struct PendingQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    ready: Notify,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity: capacity.max(1),
            ready: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueue a task, returning the evicted one on overflow.
    pub fn push(&self, task: PendingTask) -> Result<Option<PendingTask>, DispatchError> {
        let evicted = {
            let mut state = self.lock();
            if state.closed {
                return Err(DispatchError::Closed);
            }
            let evicted = if state.tasks.len() >= self.capacity {
                state.tasks.pop_front()
            } else {
                None
            };
            state.tasks.push_back(task);
            evicted
        };

        self.ready.notify_one();
        Ok(evicted)
    }

    /// Wait for the next task. `None` once the queue is closed.
    pub async fn pop(&self) -> Option<PendingTask> {
        loop {
            let notified = self.ready.notified();
            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(task) = state.tasks.pop_front() {
                    return Some(task);
                }
            }
            notified.await;
        }
    }

    /// Refuse further pushes and hand back everything still waiting.
    pub fn close(&self) -> Vec<PendingTask> {
        let drained = {
            let mut state = self.lock();
            state.closed = true;
            state.tasks.drain(..).collect()
        };
        self.ready.notify_waiters();
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
