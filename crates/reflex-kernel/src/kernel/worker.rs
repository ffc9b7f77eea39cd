//! Inference workers - encode, predict and resolve off the mutation context.

use std::sync::Arc;

use chrono::Utc;
use reflex_core::{ActionCatalog, ActionName};
use tokio::sync::mpsc;

use super::queue::PendingQueue;
use super::shutdown::ShutdownListener;
use super::task::{Decision, PendingTask, TaskState};
use crate::error::InferenceError;
use crate::model::ModelAdapter;
use crate::observability::{DecisionLog, DecisionRecord, DispatchStats};

/// Shared pieces every worker reads from.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub queue: Arc<PendingQueue>,
    pub models: Arc<ModelAdapter>,
    pub catalog: Arc<ActionCatalog>,
    pub decisions: mpsc::Sender<Decision>,
    pub stats: Arc<DispatchStats>,
    pub log: Option<Arc<DecisionLog>>,
}

/// One member of the inference pool.
pub(crate) struct InferenceWorker {
    index: usize,
    ctx: WorkerContext,
    shutdown: ShutdownListener,
}

impl InferenceWorker {
    pub fn new(index: usize, ctx: WorkerContext, shutdown: ShutdownListener) -> Self {
        Self {
            index,
            ctx,
            shutdown,
        }
    }

    /// Pull tasks until the queue closes or shutdown fires.
    pub async fn run(mut self) {
        tracing::debug!(worker = self.index, "Inference worker started");

        loop {
            let task = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                task = self.ctx.queue.pop() => match task {
                    Some(task) => task,
                    None => break,
                },
            };
            self.handle(task).await;
        }

        tracing::debug!(worker = self.index, "Inference worker stopped");
    }

    async fn handle(&mut self, mut task: PendingTask) {
        if self.shutdown.is_cancelled() {
            self.cancel(task);
            return;
        }

        task.advance(TaskState::Encoding);
        let input = task.encode();
        task.advance(TaskState::Inferring);

        // Captured once; a reload from here on does not affect this task.
        let handle = self.ctx.models.current();
        let generation = handle.generation();

        let predicted = {
            let input = input.clone();
            let blocking = tokio::task::spawn_blocking(move || handle.predict(&input));
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    self.cancel(task);
                    return;
                }
                joined = blocking => joined
                    .unwrap_or_else(|e| Err(InferenceError::Backend(e.to_string()))),
            }
        };

        let (action_id, action, fallback) = match predicted {
            Ok(id) => match self.ctx.catalog.get(id) {
                Some(name) => (Some(id), name.clone(), None),
                None => (
                    Some(id),
                    ActionName::idle(),
                    Some(format!("unknown action id {id}")),
                ),
            },
            Err(e) => {
                self.ctx.stats.record_inference_failure();
                tracing::warn!(
                    task_id = %task.id(),
                    channel = %task.channel(),
                    generation,
                    error = %e,
                    "Inference failed, idling"
                );
                (None, ActionName::idle(), Some(e.to_string()))
            }
        };

        tracing::debug!(
            task_id = %task.id(),
            channel = %task.channel(),
            generation,
            action = %action,
            "Decision resolved"
        );

        if let Some(log) = &self.ctx.log {
            let record = DecisionRecord {
                timestamp: Utc::now(),
                session: log.session(),
                task_id: task.id(),
                channel: task.channel(),
                generation,
                action_id: action_id.map(|id| id.0),
                action: action.to_string(),
                fallback,
                input: input.to_string_lossy().into_owned(),
            };
            if let Err(e) = log.emit(&record) {
                tracing::warn!(path = %log.path().display(), error = %e, "Failed to log decision");
            }
        }
        self.ctx.stats.record_decided();

        // Hand-off to the mutation context; still cancellable while waiting.
        let permit = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                self.cancel(task);
                return;
            }
            permit = self.ctx.decisions.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    self.cancel(task);
                    return;
                }
            },
        };

        permit.send(Decision {
            task,
            action_id,
            action,
            generation,
        });
    }

    fn cancel(&self, mut task: PendingTask) {
        if task.cancel() {
            self.ctx.stats.record_cancelled(1);
            tracing::debug!(task_id = %task.id(), channel = %task.channel(), "Task cancelled");
        }
    }
}
