//! # Watch Service - Keeping a Vault's MOC Links Current
//!
//! [`WatchService`] watches vault directories for changes and feeds them to one
//! [`EventRouter`] per vault.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use moc_core::{config::MocConfig, event::Event, watch::WatchService};
//! use std::{path::PathBuf, sync::mpsc::channel};
//!
//! let (tx, rx) = channel::<Event>();
//! let service = WatchService::new(tx)?;
//!
//! // Initial reconciliation happens right away
//! let vault = PathBuf::from("/path/to/vault");
//! service.enable_vault(&vault, MocConfig::default())?;
//!
//! for event in rx {
//!     println!("{event}");
//! }
//! # Ok::<(), moc_core::MocError>(())
//! ```
//!
//! ## Threading Model
//!
//! ### Main Thread
//! - Owns the `WatchService` and its tokio runtime
//! - Enables and disables vaults
//! - Receives [`Event`]s via `mpsc::channel`
//!
//! ### Watcher Thread (one per vault, owned by notify-debouncer-full)
//! - Coalesces raw filesystem events for `timing.watcher_debounce_ms`
//! - Translates them into [`Notification`]s with [`translate_event`]
//! - Sends them on an unbounded channel; never touches documents
//!
//! ### Router Task (one per vault, on the runtime)
//! - Handles one notification at a time
//! - Arms debounce timers, whose jobs run on per-document write lanes
//!
//! ## Rename Cascades
//!
//! A folder rename reaches the watcher as a single paired event. Vault hosts report it as one
//! rename per path beneath the folder, and the rename sessions expect exactly that, so the
//! translation synthesizes one `Renamed` notification for every descendant after the folder's
//! own.
use crate::{
    config::MocConfig,
    engine::MocEngine,
    error::MocError,
    event::{Event, EventSink},
    paths::{rebase, to_vault_path, TRIM},
    router::{EventRouter, Notification},
    store::FsStore,
    tree::NodeKind,
};

use notify_debouncer_full::{
    new_debouncer,
    notify::{
        event::{CreateKind, ModifyKind, RenameMode},
        EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    },
    DebounceEventResult, Debouncer, FileIdMap,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    result::Result,
    sync::{mpsc::Sender, Arc},
};
use tokio::{
    runtime::Runtime,
    sync::mpsc::{unbounded_channel, UnboundedSender},
    task::JoinHandle,
};
use walkdir::WalkDir;

/// A file system watcher with debouncing for one vault
type VaultWatcher = Debouncer<RecommendedWatcher, FileIdMap>;

struct VaultHandle {
    watcher: VaultWatcher,
    router: EventRouter,
    router_handle: JoinHandle<()>,
}

pub struct WatchService {
    vaults: Arc<Mutex<HashMap<PathBuf, VaultHandle>>>,
    event_tx: Sender<Event>,
    runtime: Runtime,
}

impl WatchService {
    pub fn new(event_tx: Sender<Event>) -> Result<Self, MocError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        Ok(WatchService {
            vaults: Arc::new(Mutex::new(HashMap::new())),
            event_tx,
            runtime,
        })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn router(&self, root: &Path) -> Option<EventRouter> {
        self.vaults.lock().get(root).map(|handle| handle.router.clone())
    }

    /// Start watching the vault at `root`. Every index file is refreshed once up front.
    pub fn enable_vault(&self, root: &Path, config: MocConfig) -> Result<EventRouter, MocError> {
        let mut vaults = self.vaults.lock();
        if vaults.contains_key(root) {
            return Err(MocError::Service(format!(
                "A watcher is already running for the vault at {root:?}"
            )));
        }

        let store = Arc::new(FsStore::new(root)?);
        let watcher_window = config.timing.watcher_debounce();
        let engine = Arc::new(MocEngine::new(
            store,
            config,
            EventSink::new(self.event_tx.clone()),
        ));
        let router = EventRouter::new(engine);

        let _guard = self.runtime.enter();
        let (tx, rx) = unbounded_channel::<Notification>();
        let router_handle = router.clone().spawn(rx);
        router.reconcile_now();

        let watch_root = root.to_path_buf();
        let mut watcher = new_debouncer(
            watcher_window,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    tracing::debug!("[Debouncer] processing {} events", events.len());
                    for event in events.iter() {
                        let notifications =
                            translate_event(&watch_root, &event.event.kind, &event.paths);
                        for notification in notifications {
                            if let Err(e) = forward(&tx, notification) {
                                tracing::warn!("[Debouncer] {e}");
                            }
                        }
                    }
                }
                Err(errors) => {
                    tracing::error!("Notify debouncer returned errors: {:?}", errors);
                }
            },
        )?;
        watcher.watcher().watch(root, RecursiveMode::Recursive)?;
        tracing::info!("[WatchService] Watching vault {root:?}");

        vaults.insert(
            root.to_path_buf(),
            VaultHandle {
                watcher,
                router: router.clone(),
                router_handle,
            },
        );
        Ok(router)
    }

    pub fn disable_vault(&self, root: &Path) -> Result<(), MocError> {
        if let Some(mut handle) = self.vaults.lock().remove(root) {
            let unwatch_res = handle.watcher.watcher().unwatch(root);
            tracing::debug!("Unwatch_res(path: {:?}) = {:?}", root, unwatch_res);
            handle.router.scheduler().cancel_all();
            handle.router_handle.abort();
            unwatch_res?;
        }
        Ok(())
    }

    pub fn vault_count(&self) -> usize {
        self.vaults.lock().len()
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        for (_, handle) in self.vaults.lock().drain() {
            handle.router.scheduler().cancel_all();
            handle.router_handle.abort();
        }
    }
}

fn forward(
    tx: &UnboundedSender<Notification>,
    notification: Notification,
) -> Result<(), MocError> {
    Ok(tx.send(notification)?)
}

fn is_hidden(vault_path: &str) -> bool {
    vault_path.split(TRIM).any(|segment| segment.starts_with('.'))
}

fn node_kind(abs: &Path) -> NodeKind {
    if abs.is_dir() {
        NodeKind::Folder
    } else {
        NodeKind::Document
    }
}

/// Translate one debounced filesystem event into host notifications, in delivery order.
/// Paths outside `root` and hidden entries are dropped.
pub fn translate_event(root: &Path, kind: &EventKind, paths: &[PathBuf]) -> Vec<Notification> {
    let vault_path = |abs: &PathBuf| -> Option<String> {
        match to_vault_path(root, abs) {
            Ok(path) if !path.is_empty() && !is_hidden(&path) => Some(path),
            _ => None,
        }
    };
    let mut out = Vec::new();
    match kind {
        EventKind::Create(create_kind) => {
            for abs in paths {
                if let Some(path) = vault_path(abs) {
                    let kind = match create_kind {
                        CreateKind::Folder => NodeKind::Folder,
                        CreateKind::File => NodeKind::Document,
                        _ => node_kind(abs),
                    };
                    out.push(Notification::Created { path, kind });
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let (Some(from), Some(to)) = (paths.first(), paths.get(1)) else {
                return out;
            };
            match (vault_path(from), vault_path(to)) {
                (Some(old_path), Some(path)) => {
                    let kind = node_kind(to);
                    out.push(Notification::Renamed {
                        path: path.clone(),
                        old_path: old_path.clone(),
                        kind,
                    });
                    if kind == NodeKind::Folder {
                        out.extend(cascade(root, to, &path, &old_path));
                    }
                }
                (None, Some(path)) => out.push(Notification::Created {
                    path,
                    kind: node_kind(to),
                }),
                (Some(old_path), None) => out.push(Notification::Deleted { path: old_path }),
                (None, None) => {}
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
            out.extend(
                paths
                    .iter()
                    .filter_map(vault_path)
                    .map(|path| Notification::Deleted { path }),
            );
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            for abs in paths {
                if let Some(path) = vault_path(abs) {
                    if abs.exists() {
                        out.push(Notification::Created {
                            path,
                            kind: node_kind(abs),
                        });
                    } else {
                        out.push(Notification::Deleted { path });
                    }
                }
            }
        }
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
            for abs in paths.iter().filter(|abs| abs.is_file()) {
                if let Some(path) = vault_path(abs) {
                    out.push(Notification::Modified { path });
                }
            }
        }
        _ => {}
    }
    out
}

/// One rename per entry beneath a renamed folder, parents before children.
fn cascade(root: &Path, new_abs: &Path, new_base: &str, old_base: &str) -> Vec<Notification> {
    WalkDir::new(new_abs)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with('.'))
                .unwrap_or(false)
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("[WatchService] Skipping entry during rename cascade: {e}");
                None
            }
        })
        .filter_map(|entry| {
            let path = to_vault_path(root, entry.path()).ok()?;
            let old_path = rebase(&path, new_base, old_base)?;
            let kind = if entry.file_type().is_dir() {
                NodeKind::Folder
            } else {
                NodeKind::Document
            };
            Some(Notification::Renamed {
                path,
                old_path,
                kind,
            })
        })
        .collect()
}
