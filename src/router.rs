//! Host notifications in, scheduled update jobs out.
//!
//! [`EventRouter::handle`] is synchronous: it updates the coordinator state and arms debounce
//! timers, nothing more. All store access happens later in jobs on the write lanes, so the
//! session and suppression bookkeeping for a notification is complete before the next
//! notification is looked at.
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    task::JoinHandle,
    time::{sleep_until, Instant},
};

use crate::{
    engine::MocEngine,
    error::MocError,
    event::Event,
    paths,
    scheduler::{Job, Scheduler, UpdateKind},
    session::{CoordinatorState, RenameClass},
    tree::NodeKind,
};

/// A change reported by the host store, delivered one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Created {
        path: String,
        kind: NodeKind,
    },
    Renamed {
        path: String,
        old_path: String,
        kind: NodeKind,
    },
    Modified {
        path: String,
    },
    Deleted {
        path: String,
    },
}

impl Notification {
    pub fn path(&self) -> &str {
        match self {
            Notification::Created { path, .. }
            | Notification::Renamed { path, .. }
            | Notification::Modified { path }
            | Notification::Deleted { path } => path,
        }
    }
}

struct RouterInner {
    engine: Arc<MocEngine>,
    state: Arc<Mutex<CoordinatorState>>,
    scheduler: Scheduler,
    expiry: Mutex<Option<JoinHandle<()>>>,
}

impl RouterInner {
    /// Operation boundary: failures end the update here and are reported, never retried.
    fn settle<T>(&self, operation: &str, path: &str, result: Result<T, MocError>) {
        match result {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("[EventRouter] {operation} skipped for {path}: {e}");
            }
            Err(e) => {
                tracing::error!("[EventRouter] {operation} failed for {path}: {e}");
                self.engine.events().emit(Event::Failure {
                    operation: format!("{operation} ({path})"),
                    message: e.to_string(),
                });
            }
        }
    }

    /// Enqueue a refresh of every index file. The jobs share one snapshot of the tree, taken
    /// here; each job still checks that its document exists before touching it.
    fn reconcile(self: &Arc<Self>) {
        let root = match self.engine.store().root() {
            Ok(root) => Arc::new(root),
            Err(e) => return self.settle("Tree update", "vault", Err::<(), MocError>(e)),
        };
        let index_files = self.engine.index_files_in(&root);
        tracing::debug!("[EventRouter] Reconciling {} index files", index_files.len());
        for path in index_files {
            let weak = Arc::downgrade(self);
            let root = root.clone();
            let target = path.clone();
            let job: Job = Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    let result = inner.engine.refresh_links_in(&root, &target);
                    inner.settle("Links update", &target, result);
                }
            });
            self.scheduler.queue().enqueue(&path, job);
        }
    }
}

#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl EventRouter {
    pub fn new(engine: Arc<MocEngine>) -> Self {
        let timing = &engine.config().timing;
        let state = CoordinatorState::new(timing.session_timeout());
        let scheduler = Scheduler::new(timing);
        EventRouter {
            inner: Arc::new(RouterInner {
                engine,
                state: Arc::new(Mutex::new(state)),
                scheduler,
                expiry: Mutex::new(None),
            }),
        }
    }

    pub fn engine(&self) -> &Arc<MocEngine> {
        &self.inner.engine
    }

    pub fn state(&self) -> &Arc<Mutex<CoordinatorState>> {
        &self.inner.state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Drain `rx` until every sender is gone, one notification at a time.
    pub fn spawn(self, mut rx: UnboundedReceiver<Notification>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("[EventRouter] Starting notification loop");
            while let Some(notification) = rx.recv().await {
                self.handle(notification);
            }
            self.inner.scheduler.cancel_all();
            tracing::info!("[EventRouter] Notification channel closed");
        })
    }

    /// Route one notification. Must be called from within a tokio runtime.
    pub fn handle(&self, notification: Notification) {
        let config = self.inner.engine.config();
        if config.is_excluded(notification.path()) {
            tracing::debug!("[EventRouter] Dropping excluded {notification:?}");
            if let Notification::Renamed { old_path, .. } = &notification {
                // a system rename into an excluded path is never classified
                self.inner.state.lock().consume_suppression(old_path);
            }
            return;
        }
        tracing::debug!("[EventRouter] {notification:?}");
        match notification {
            Notification::Created {
                path,
                kind: NodeKind::Folder,
            } => {
                if config.auto_create_index {
                    self.create_index_file(&path);
                }
                self.schedule_tree();
            }
            Notification::Created {
                kind: NodeKind::Document,
                ..
            } => self.schedule_tree(),
            Notification::Modified { path } => {
                if paths::extension(&path) == Some("md") {
                    self.schedule_links(&path);
                }
            }
            Notification::Deleted { path } => {
                // the source half of a rename the watcher could not pair
                self.inner.state.lock().consume_suppression(&path);
                self.inner.scheduler.forget(&path);
                self.schedule_tree();
            }
            Notification::Renamed {
                path,
                old_path,
                kind,
            } => self.handle_rename(&path, &old_path, kind),
        }
    }

    fn handle_rename(&self, path: &str, old_path: &str, kind: NodeKind) {
        self.inner.scheduler.forget(old_path);
        let class = self
            .inner
            .state
            .lock()
            .classify_rename(path, old_path, kind, Instant::now());
        match class {
            RenameClass::SelfInflicted => {
                self.schedule_tree();
                if kind == NodeKind::Folder {
                    // an emoji rename is followed by the index file rename
                    self.schedule_correction(path);
                }
            }
            RenameClass::NewSession => {
                tracing::info!("[EventRouter] Rename {old_path} -> {path} starts a session");
                self.arm_expiry();
                self.schedule_tree();
                if kind == NodeKind::Folder {
                    self.schedule_correction(path);
                }
            }
            RenameClass::Cascade => self.arm_expiry(),
        }
    }

    fn create_index_file(&self, folder: &str) {
        let weak = Arc::downgrade(&self.inner);
        let target = folder.to_string();
        let job: Job = Box::pin(async move {
            if let Some(inner) = weak.upgrade() {
                let result = inner.engine.create_index_file(&target);
                inner.settle("Index file creation", &target, result);
            }
        });
        self.inner.scheduler.queue().enqueue(folder, job);
    }

    fn schedule_links(&self, path: &str) {
        let weak = Arc::downgrade(&self.inner);
        let target = path.to_string();
        self.inner
            .scheduler
            .schedule(UpdateKind::Links, path, move || -> Job {
                Box::pin(async move {
                    if let Some(inner) = weak.upgrade() {
                        let result = inner.engine.refresh_links(&target);
                        inner.settle("Links update", &target, result);
                    }
                })
            });
    }

    fn schedule_correction(&self, folder: &str) {
        let config = self.inner.engine.config();
        if config.folder_emoji.is_empty() && !config.auto_rename_index {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let target = folder.to_string();
        self.inner
            .scheduler
            .schedule(UpdateKind::Rename, folder, move || -> Job {
                Box::pin(async move {
                    if let Some(inner) = weak.upgrade() {
                        let result = inner.engine.correct_folder(&inner.state, &target);
                        inner.settle("Corrective rename", &target, result);
                    }
                })
            });
    }

    /// Debounced refresh of every index file in the vault.
    pub fn schedule_tree(&self) {
        let weak: Weak<RouterInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule_tree(move || {
            if let Some(inner) = weak.upgrade() {
                inner.reconcile();
            }
        });
    }

    /// Enqueue a refresh of every index file right away.
    pub fn reconcile_now(&self) {
        self.inner.reconcile();
    }

    fn arm_expiry(&self) {
        let Some((generation, deadline)) = self.inner.state.lock().expiry() else {
            return;
        };
        let state = self.inner.state.clone();
        let timer = tokio::spawn(async move {
            sleep_until(deadline).await;
            let mut state = state.lock();
            if state.expiry().is_some_and(|(current, _)| current == generation) {
                state.expire(Instant::now());
            }
        });
        if let Some(previous) = self.inner.expiry.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Wait for every job already on a write lane to finish.
    pub async fn flush(&self) {
        self.inner.scheduler.queue().flush().await;
    }
}
