//! The update operations run by scheduled jobs and by the CLI.
//!
//! Every operation takes a fresh tree snapshot from the store; nothing derived from a previous
//! snapshot is reused. Operations are synchronous. The router runs them on per-document write
//! lanes, which is what keeps two updates of one document from interleaving.
use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    config::MocConfig,
    error::MocError,
    event::{Event, EventSink},
    metadata::{marker_frontmatter, MarkerPredicate},
    paths::{file_name, parent_path, path_join},
    region::{self, LinkRenderer, DEFAULT_LEADING_BLANK_LINES},
    resolver::{GraphResolver, Resolution},
    session::CoordinatorState,
    store::DocumentStore,
    tree::{Folder, NodeKind, TreeNode},
};

/// What [`MocEngine::refresh_links`] did to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    /// The recomputed block matched the stored text, nothing was written.
    Unchanged,
    /// Missing, excluded, or not an index file.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub updated: Vec<String>,
    pub unchanged: usize,
    pub failed: Vec<(String, MocError)>,
}

pub struct MocEngine {
    store: Arc<dyn DocumentStore>,
    config: MocConfig,
    predicate: MarkerPredicate,
    events: EventSink,
}

impl MocEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: MocConfig, events: EventSink) -> Self {
        let predicate = MarkerPredicate::from_config(&config);
        MocEngine {
            store,
            config,
            predicate,
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &MocConfig {
        &self.config
    }

    pub fn predicate(&self) -> &MarkerPredicate {
        &self.predicate
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn is_index_file(&self, path: &str) -> bool {
        self.predicate.is_marked(self.store.metadata(path).as_ref())
    }

    /// Vault paths of every index file outside the excluded paths.
    pub fn index_files(&self) -> Result<Vec<String>, MocError> {
        let root = self.store.root()?;
        Ok(self.index_files_in(&root))
    }

    pub fn index_files_in(&self, root: &Folder) -> Vec<String> {
        GraphResolver::new(root, &self.predicate)
            .all_index_files()
            .into_iter()
            .filter(|doc| !self.config.is_excluded(&doc.path))
            .map(|doc| doc.path.clone())
            .collect()
    }

    fn report(&self, resolution: &Resolution<'_>) {
        for diagnostic in resolution.diagnostics.iter() {
            self.events.emit(Event::Anomaly {
                message: diagnostic.to_string(),
            });
        }
    }

    /// Render the block `path` would carry right now, without touching the document.
    pub fn render_block(&self, path: &str) -> Result<String, MocError> {
        let root = self.store.root()?;
        if root.find_document(path).is_none() {
            return Err(MocError::NotFound(format!("No document at {path}")));
        }
        let resolution = GraphResolver::new(&root, &self.predicate).resolve_graph(path);
        let links = LinkRenderer::new(self.config.link_format, path);
        Ok(region::encode(&resolution.graph, &self.config.header, &links))
    }

    /// Recompute and rewrite the block of one index file.
    pub fn refresh_links(&self, path: &str) -> Result<RefreshOutcome, MocError> {
        if !self.store.exists(path) {
            tracing::debug!("[MocEngine] {path} vanished before its refresh, skipping");
            return Ok(RefreshOutcome::Skipped);
        }
        let root = self.store.root()?;
        self.refresh_in(&root, path)
    }

    /// [`MocEngine::refresh_links`] against a snapshot shared by several refreshes.
    pub fn refresh_links_in(&self, root: &Folder, path: &str) -> Result<RefreshOutcome, MocError> {
        if !self.store.exists(path) {
            tracing::debug!("[MocEngine] {path} vanished before its refresh, skipping");
            return Ok(RefreshOutcome::Skipped);
        }
        self.refresh_in(root, path)
    }

    fn refresh_in(&self, root: &Folder, path: &str) -> Result<RefreshOutcome, MocError> {
        if self.config.is_excluded(path) || !self.is_index_file(path) {
            return Ok(RefreshOutcome::Skipped);
        }
        let resolution = GraphResolver::new(root, &self.predicate).resolve_graph(path);
        self.report(&resolution);

        let text = self.store.read(path)?;
        let links = LinkRenderer::new(self.config.link_format, path);
        let updated = region::update(&text, &resolution.graph, &self.config.header, &links);
        if updated == text {
            tracing::debug!("[MocEngine] {path} already up to date");
            return Ok(RefreshOutcome::Unchanged);
        }
        self.store.write(path, &updated)?;
        tracing::info!("[MocEngine] Updated MOC links in {path}");
        self.events.emit(Event::LinksUpdated {
            path: path.to_string(),
        });
        Ok(RefreshOutcome::Updated)
    }

    /// Refresh every index file against one snapshot. Failures are collected, not returned.
    pub fn sync_all(&self) -> Result<SyncReport, MocError> {
        let root = self.store.root()?;
        let index_files: Vec<String> = GraphResolver::new(&root, &self.predicate)
            .all_index_files()
            .into_iter()
            .map(|doc| doc.path.clone())
            .collect();
        let mut report = SyncReport::default();
        for path in index_files {
            match self.refresh_in(&root, &path) {
                Ok(RefreshOutcome::Updated) => report.updated.push(path),
                Ok(RefreshOutcome::Unchanged) => report.unchanged += 1,
                Ok(RefreshOutcome::Skipped) => {}
                Err(e) => {
                    tracing::error!("[MocEngine] Failed to update {path}: {e}");
                    report.failed.push((path, e));
                }
            }
        }
        Ok(report)
    }

    /// Create the index file of a folder that has none. Returns the new file's path.
    pub fn create_index_file(&self, folder: &str) -> Result<Option<String>, MocError> {
        if folder.is_empty() || self.config.is_excluded(folder) || !self.store.is_folder(folder) {
            return Ok(None);
        }
        let children = self.store.list_children(folder)?;
        let has_index = children.iter().any(|child| match child {
            TreeNode::Document(doc) => self.predicate.is_marked(doc.metadata.as_ref()),
            TreeNode::Folder(_) => false,
        });
        if has_index {
            tracing::debug!("[MocEngine] {folder} already has an index file");
            return Ok(None);
        }
        let path = path_join(folder, &self.config.index_file_name(file_name(folder)));
        if self.store.exists(&path) {
            tracing::debug!("[MocEngine] {path} exists but is not marked, leaving it alone");
            return Ok(None);
        }
        let text = marker_frontmatter(&self.config.marker_key, &self.config.marker_value);
        self.store.create(&path, &text)?;
        tracing::info!("[MocEngine] Created index file {path}");
        self.events.emit(Event::IndexCreated { path: path.clone() });
        Ok(Some(path))
    }

    /// Where a user-renamed folder should move to get its emoji prefix, if anywhere.
    pub fn emoji_rename_target(&self, folder: &str) -> Option<String> {
        if folder.is_empty() {
            return None;
        }
        let parent = parent_path(folder).unwrap_or("");
        self.config
            .emoji_folder_name(file_name(folder))
            .map(|name| path_join(parent, &name))
    }

    /// The rename that brings a folder's single index file in line with the naming template.
    pub fn index_rename_target(&self, folder: &str) -> Result<Option<(String, String)>, MocError> {
        if folder.is_empty() || !self.config.auto_rename_index || !self.store.is_folder(folder) {
            return Ok(None);
        }
        let index_files: Vec<String> = self
            .store
            .list_children(folder)?
            .into_iter()
            .filter_map(|child| match child {
                TreeNode::Document(doc) if self.predicate.is_marked(doc.metadata.as_ref()) => {
                    Some(doc.path)
                }
                _ => None,
            })
            .collect();
        let [current] = index_files.as_slice() else {
            if index_files.len() > 1 {
                self.events.emit(Event::Anomaly {
                    message: format!(
                        "Not renaming index files of '{folder}': found {}",
                        index_files.join(", ")
                    ),
                });
            }
            return Ok(None);
        };
        let expected = path_join(folder, &self.config.index_file_name(file_name(folder)));
        if *current == expected || self.store.exists(&expected) {
            return Ok(None);
        }
        Ok(Some((current.clone(), expected)))
    }

    /// Rename on behalf of the system. The old path is registered as self-inflicted before
    /// the store is touched and withdrawn again if the rename fails.
    pub fn rename_with_suppression(
        &self,
        state: &Mutex<CoordinatorState>,
        old_path: &str,
        new_path: &str,
        kind: NodeKind,
    ) -> Result<(), MocError> {
        state
            .lock()
            .register_system_rename(old_path, new_path, kind);
        if let Err(e) = self.store.rename(old_path, new_path) {
            state.lock().unregister_system_rename(old_path);
            return Err(e);
        }
        tracing::info!("[MocEngine] Renamed {old_path} -> {new_path}");
        self.events.emit(Event::Renamed {
            from: old_path.to_string(),
            to: new_path.to_string(),
        });
        Ok(())
    }

    /// Apply the first pending corrective rename of a folder: the emoji prefix, otherwise the
    /// index file name. The notification of the first rename schedules the second.
    pub fn correct_folder(
        &self,
        state: &Mutex<CoordinatorState>,
        folder: &str,
    ) -> Result<Option<String>, MocError> {
        if !self.store.is_folder(folder) || self.config.is_excluded(folder) {
            return Ok(None);
        }
        if let Some(target) = self.emoji_rename_target(folder) {
            if !self.store.exists(&target) {
                self.rename_with_suppression(state, folder, &target, NodeKind::Folder)?;
                return Ok(Some(target));
            }
        }
        match self.index_rename_target(folder)? {
            Some((current, expected)) => {
                self.rename_with_suppression(state, &current, &expected, NodeKind::Document)?;
                Ok(Some(expected))
            }
            None => Ok(None),
        }
    }

    /// Append a block after the usual padding, leaving existing whitespace alone.
    pub fn insert_links(&self, path: &str) -> Result<(), MocError> {
        let root = self.store.root()?;
        if root.find_document(path).is_none() {
            return Err(MocError::NotFound(format!("No document at {path}")));
        }
        let resolution = GraphResolver::new(&root, &self.predicate).resolve_graph(path);
        self.report(&resolution);
        let text = self.store.read(path)?;
        let links = LinkRenderer::new(self.config.link_format, path);
        let stripped = region::strip(&text, false);
        let updated = region::inject(
            &stripped,
            &resolution.graph,
            &self.config.header,
            &links,
            DEFAULT_LEADING_BLANK_LINES,
        );
        self.store.write(path, &updated)?;
        self.events.emit(Event::LinksUpdated {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Remove the block from a document. Returns whether there was one.
    pub fn strip_links(&self, path: &str) -> Result<bool, MocError> {
        let text = self.store.read(path)?;
        if region::locate(&text).is_none() {
            return Ok(false);
        }
        self.store.write(path, &region::strip(&text, true))?;
        tracing::info!("[MocEngine] Removed MOC links from {path}");
        Ok(true)
    }
}
