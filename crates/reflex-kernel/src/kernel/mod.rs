//! Kernel - dispatching, inference workers and the mutation context.

mod applier;
mod dispatcher;
mod queue;
mod shutdown;
mod task;
mod worker;

pub use applier::{Applied, Applier};
pub use dispatcher::Dispatcher;
pub use queue::PendingQueue;
pub use shutdown::{Shutdown, ShutdownListener};
pub use task::{Channel, Decision, PendingTask, TaskId, TaskState};

pub(crate) use worker::{InferenceWorker, WorkerContext};
