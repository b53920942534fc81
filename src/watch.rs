//! Folder watcher: turns filesystem notifications into intake tasks.
//!
//! A non-recursive [`notify`] watcher feeds a tokio channel. Every created or
//! renamed-into-place file with an accepted extension gets its own task, so
//! uploads of different files overlap. Within a task the file is first left
//! alone for `settle` (screenshot tools often create the file before they
//! finish writing it), then handed to the [`IntakeCoordinator`].
//!
//! A path that already has a task is not started again; editors and
//! screenshot tools tend to emit several events per file. With
//! `max_in_flight` set, tasks wait for a semaphore permit before doing any
//! work.
//!
//! Files present before the watcher starts are not processed.

use crate::config::WatchConfig;
use crate::intake::{IntakeCoordinator, IntakeOutcome};
use crate::naming::is_accepted_image;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch folder {0} does not exist or is not a directory")]
    MissingFolder(PathBuf),
    #[error("Failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Paths in `event` that may be new files ready for intake.
///
/// Create events yield all their paths; rename events yield the destination
/// only. Everything else (modify, access, remove) yields nothing.
pub fn intake_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Watches one folder and dispatches intakes.
pub struct FolderWatcher {
    coordinator: IntakeCoordinator,
    settle: Duration,
    limit: Option<Arc<Semaphore>>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FolderWatcher {
    pub fn new(coordinator: IntakeCoordinator, settle: Duration, max_in_flight: Option<usize>) -> Self {
        Self {
            coordinator,
            settle,
            limit: max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn from_config(coordinator: IntakeCoordinator, config: &WatchConfig) -> Self {
        Self::new(
            coordinator,
            Duration::from_millis(config.settle_ms),
            config.max_in_flight,
        )
    }

    /// Watch `folder` until Ctrl-C.
    pub async fn run(&self, folder: &Path) -> Result<(), WatchError> {
        self.run_until(folder, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Watch `folder` until `shutdown` completes.
    pub async fn run_until(
        &self,
        folder: &Path,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), WatchError> {
        if !folder.is_dir() {
            return Err(WatchError::MissingFolder(folder.to_path_buf()));
        }
        let notify_err = |source| WatchError::Notify {
            path: folder.to_path_buf(),
            source,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver only goes away on shutdown.
            let _ = tx.send(res);
        })
        .map_err(notify_err)?;
        watcher
            .watch(folder, RecursiveMode::NonRecursive)
            .map_err(notify_err)?;

        info!(folder = %folder.display(), "watching for new images");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("stopping watcher");
                    break;
                }
                message = rx.recv() => match message {
                    Some(Ok(event)) => {
                        for path in intake_paths(&event) {
                            self.dispatch(path);
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "watch error"),
                    None => break,
                },
            }
        }
        Ok(())
    }

    /// Spawn an intake task for `path` unless it is filtered or already running.
    pub fn dispatch(&self, path: PathBuf) -> Option<JoinHandle<IntakeOutcome>> {
        if !is_accepted_image(&path) {
            debug!(path = %path.display(), "ignoring non-image file");
            return None;
        }
        if !lock(&self.in_flight).insert(path.clone()) {
            debug!(path = %path.display(), "already in flight");
            return None;
        }

        let coordinator = self.coordinator.clone();
        let limit = self.limit.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let settle = self.settle;

        Some(tokio::spawn(async move {
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            tokio::time::sleep(settle).await;
            let outcome = coordinator.handle(&path).await;
            lock(&in_flight).remove(&path);
            outcome
        }))
    }
}

fn lock(set: &Mutex<HashSet<PathBuf>>) -> MutexGuard<'_, HashSet<PathBuf>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
