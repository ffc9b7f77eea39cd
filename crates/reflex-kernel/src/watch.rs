//! Model watcher - reload when the artifact changes on disk.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::commands::{Command, CommandHandler};
use crate::kernel::ShutdownListener;

/// Writes landing within this window collapse into one reload.
const DEBOUNCE: Duration = Duration::from_millis(200);
const POLL: Duration = Duration::from_millis(500);

/// Watches the model artifact and reloads it through the command path, so
/// the outcome is announced like a manual `reload`.
///
/// Stops on shutdown or when dropped.
pub struct ModelWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ModelWatcher {
    pub fn spawn(
        path: &Path,
        commands: CommandHandler,
        shutdown: ShutdownListener,
    ) -> notify::Result<Self> {
        let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.send(res);
            },
            Config::default().with_poll_interval(POLL),
        )?;

        // Editors often replace the file, so watch its directory.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        let target = path.to_path_buf();
        thread::Builder::new()
            .name("reflex-model-watch".into())
            .spawn(move || watch_loop(&target, &event_rx, &commands, &shutdown))?;

        tracing::info!(path = %path.display(), "Watching model artifact");
        Ok(Self {
            _watcher: watcher,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn watch_loop(
    target: &Path,
    events: &mpsc::Receiver<notify::Result<Event>>,
    commands: &CommandHandler,
    shutdown: &ShutdownListener,
) {
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match events.recv_timeout(POLL) {
            Ok(Ok(event)) => {
                if !touches(&event, target) {
                    continue;
                }
                // Let the writer finish, then swallow the burst.
                thread::sleep(DEBOUNCE);
                while events.try_recv().is_ok() {}

                if shutdown.is_cancelled() {
                    break;
                }
                tracing::debug!(path = %target.display(), "Model artifact changed");
                commands.run(Command::Reload(Some(target.to_path_buf())));
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Model watcher error");
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            // Watcher dropped
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!(path = %target.display(), "Model watcher stopped");
}

fn touches(event: &Event, target: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    let name = target.file_name();
    event
        .paths
        .iter()
        .any(|p| p == target || (name.is_some() && p.file_name() == name))
}
