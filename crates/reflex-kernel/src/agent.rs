//! Agent - wires configuration, model, workers and the mutation context.

use std::sync::Arc;

use futures::future::join_all;
use reflex_core::{ActionCatalog, ActionExecutor, WorldMut};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::commands::CommandHandler;
use crate::config::AgentConfig;
use crate::error::StartupError;
use crate::kernel::{Applier, Dispatcher, InferenceWorker, PendingQueue, Shutdown, WorkerContext};
use crate::model::{ArtifactLoader, ModelAdapter, ModelLoader};
use crate::observability::{DecisionLog, DispatchStats, StatsSnapshot};
use crate::watch::ModelWatcher;

/// A running pipeline.
///
/// Created together with its [`Applier`], which the host keeps on the
/// mutation context. Everything else here is safe to share with event
/// callbacks and operator consoles.
pub struct Agent {
    config: AgentConfig,
    catalog: Arc<ActionCatalog>,
    models: Arc<ModelAdapter>,
    dispatcher: Arc<Dispatcher>,
    commands: CommandHandler,
    queue: Arc<PendingQueue>,
    stats: Arc<DispatchStats>,
    log: Option<Arc<DecisionLog>>,
    shutdown: Shutdown,
    workers: Vec<JoinHandle<()>>,
    _watcher: Option<ModelWatcher>,
}

impl Agent {
    /// Start with the built-in JSON artifact loader.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &AgentConfig) -> Result<(Self, Applier), StartupError> {
        Self::start_with_loader(config, Arc::new(ArtifactLoader))
    }

    /// Start with a custom model loader.
    pub fn start_with_loader(
        config: &AgentConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<(Self, Applier), StartupError> {
        let catalog = Arc::new(config.catalog()?);
        let models = Arc::new(ModelAdapter::load(loader, &config.model.path)?);

        let stats = Arc::new(DispatchStats::default());
        let queue = Arc::new(PendingQueue::new(config.dispatch.queue_capacity));
        let (decisions_tx, decisions_rx) = mpsc::channel(config.dispatch.apply_capacity.max(1));
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let log = config
            .decision_log
            .as_deref()
            .map(|path| Arc::new(DecisionLog::new(path)));

        let ctx = WorkerContext {
            queue: queue.clone(),
            models: models.clone(),
            catalog: catalog.clone(),
            decisions: decisions_tx,
            stats: stats.clone(),
            log: log.clone(),
        };
        let workers = (0..config.dispatch.workers.max(1))
            .map(|index| {
                let worker = InferenceWorker::new(index, ctx.clone(), shutdown.listener());
                tokio::spawn(worker.run())
            })
            .collect();

        let dispatcher = Arc::new(Dispatcher::new(queue.clone(), stats.clone(), config.channels));
        let commands = CommandHandler::new(models.clone(), &config.model.path, notices_tx);

        let watcher = if config.model.watch {
            match ModelWatcher::spawn(&config.model.path, commands.clone(), shutdown.listener()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(
                        path = %config.model.path.display(),
                        error = %e,
                        "Model watch unavailable"
                    );
                    None
                }
            }
        } else {
            None
        };

        let applier = Applier::new(
            decisions_rx,
            notices_rx,
            ActionExecutor::new(config.executor()),
            stats.clone(),
            shutdown.listener(),
        );

        tracing::info!(
            model = %config.model.path.display(),
            actions = catalog.len(),
            workers = config.dispatch.workers.max(1),
            queue_capacity = queue.capacity(),
            "Reflex agent started"
        );

        let agent = Self {
            config: config.clone(),
            catalog,
            models,
            dispatcher,
            commands,
            queue,
            stats,
            log,
            shutdown,
            workers,
            _watcher: watcher,
        };
        Ok((agent, applier))
    }

    /// Like [`Agent::start`], but a failure is also announced once on the
    /// world's notification channel.
    pub fn activate<W: WorldMut + ?Sized>(
        config: &AgentConfig,
        world: &mut W,
    ) -> Result<(Self, Applier), StartupError> {
        Self::start(config).map_err(|e| {
            tracing::error!(error = %e, "Reflex agent failed to start");
            world.notify(&e.notice());
            e
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn commands(&self) -> &CommandHandler {
        &self.commands
    }

    pub fn models(&self) -> &Arc<ModelAdapter> {
        &self.models
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn decision_log(&self) -> Option<&DecisionLog> {
        self.log.as_deref()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Cancel every task that has not started applying. Idempotent.
    ///
    /// Queued tasks are dropped, workers abandon whatever they hold and the
    /// applier discards decisions it has not started on.
    pub fn shutdown(&self) {
        if self.shutdown.is_triggered() {
            return;
        }
        self.shutdown.trigger();

        let mut cancelled = 0;
        for mut task in self.queue.close() {
            if task.cancel() {
                cancelled += 1;
            }
        }
        self.stats.record_cancelled(cancelled);

        tracing::info!(cancelled_pending = cancelled, "Reflex agent stopping");
    }

    /// Shut down, wait for the inference workers to exit and return the
    /// final counters.
    pub async fn join(mut self) -> StatsSnapshot {
        self.shutdown();
        let workers = std::mem::take(&mut self.workers);
        for result in join_all(workers).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Inference worker ended abnormally");
            }
        }
        let stats = self.stats.snapshot();
        tracing::info!(stats = %stats.summary(), "Reflex agent stopped");
        stats
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("models", &self.models)
            .field("dispatcher", &self.dispatcher)
            .field("workers", &self.workers.len())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
