//! Applier - the single mutation context.

use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use reflex_core::{ActionExecutor, ActionName, ActionOutcome, WorldMut};
use tokio::sync::mpsc;

use super::shutdown::ShutdownListener;
use super::task::{Channel, Decision, TaskId, TaskState};
use crate::observability::DispatchStats;

/// What the applier did with one effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Action {
        task: TaskId,
        channel: Channel,
        action: ActionName,
        outcome: ActionOutcome,
    },
    Notice(String),
}

/// Receiving end of the pipeline, and the only code that touches [`WorldMut`].
///
/// Not `Send`: it stays on whichever thread the host created it on, which
/// is by construction the thread allowed to mutate the world. Decisions are
/// applied in arrival order. Notices travel on their own unbounded channel
/// and go out ahead of any waiting decision, so a backlog of decisions
/// never swallows an operator reply.
pub struct Applier {
    decisions: mpsc::Receiver<Decision>,
    notices: mpsc::UnboundedReceiver<String>,
    notices_open: bool,
    executor: ActionExecutor,
    stats: Arc<DispatchStats>,
    shutdown: ShutdownListener,
    _context: PhantomData<Rc<()>>,
}

impl Applier {
    pub(crate) fn new(
        decisions: mpsc::Receiver<Decision>,
        notices: mpsc::UnboundedReceiver<String>,
        executor: ActionExecutor,
        stats: Arc<DispatchStats>,
        shutdown: ShutdownListener,
    ) -> Self {
        Self {
            decisions,
            notices,
            notices_open: true,
            executor,
            stats,
            shutdown,
            _context: PhantomData,
        }
    }

    /// Apply everything already waiting without blocking. Suited to hosts
    /// that drain once per frame or tick.
    pub fn pump<W: WorldMut + ?Sized>(&mut self, world: &mut W) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.notices.try_recv() {
            self.notify(message, world);
            applied += 1;
        }
        while let Ok(decision) = self.decisions.try_recv() {
            if self.apply(decision, world).is_some() {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next notice or decision and apply it. `None` once the
    /// pipeline is shut down or every decision sender is gone.
    pub async fn apply_next<W: WorldMut + ?Sized>(&mut self, world: &mut W) -> Option<Applied> {
        loop {
            let decision = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    self.discard_pending(world);
                    return None;
                }
                message = self.notices.recv(), if self.notices_open => match message {
                    Some(message) => return Some(self.notify(message, world)),
                    None => {
                        self.notices_open = false;
                        continue;
                    }
                },
                decision = self.decisions.recv() => decision?,
            };
            if let Some(applied) = self.apply(decision, world) {
                return Some(applied);
            }
        }
    }

    /// Apply effects until shutdown.
    pub async fn run<W: WorldMut + ?Sized>(mut self, world: &mut W) {
        while self.apply_next(world).await.is_some() {}
        tracing::debug!("Applier stopped");
    }

    fn notify<W: WorldMut + ?Sized>(&mut self, message: String, world: &mut W) -> Applied {
        world.notify(&message);
        Applied::Notice(message)
    }

    fn apply<W: WorldMut + ?Sized>(
        &mut self,
        mut decision: Decision,
        world: &mut W,
    ) -> Option<Applied> {
        if self.shutdown.is_cancelled() {
            if decision.task.cancel() {
                self.stats.record_cancelled(1);
            }
            return None;
        }

        // Past this point the task runs to completion.
        decision.task.advance(TaskState::Applying);
        let outcome = self
            .executor
            .apply(&decision.action, decision.task.snapshot(), world);
        decision.task.advance(TaskState::Idle);

        self.stats.record_applied();
        tracing::debug!(
            task_id = %decision.task.id(),
            channel = %decision.task.channel(),
            action = %decision.action,
            generation = decision.generation,
            ?outcome,
            "Action applied"
        );

        Some(Applied::Action {
            task: decision.task.id(),
            channel: decision.task.channel(),
            action: decision.action,
            outcome,
        })
    }

    /// Drop queued decisions after shutdown; notices still go out.
    fn discard_pending<W: WorldMut + ?Sized>(&mut self, world: &mut W) {
        self.notices.close();
        while let Ok(message) = self.notices.try_recv() {
            self.notify(message, world);
        }
        self.decisions.close();
        while let Ok(decision) = self.decisions.try_recv() {
            self.apply(decision, world);
        }
    }
}

impl std::fmt::Debug for Applier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applier")
            .field("executor", &self.executor)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
