//! Parent / children / sibling resolution for index files.
//!
//! A [`LinkGraph`] is derived from one tree snapshot and borrows from it, so it cannot outlive
//! the operation that produced it. Every update recomputes the graph from scratch: a folder
//! move can change the answer for documents arbitrarily far from the moved folder.
//!
//! Traversals terminate without cycle bookkeeping because the snapshot is a tree: the parent
//! walk strictly shortens the path toward the root and the children walk strictly descends.
use std::fmt::{Display, Formatter};

use crate::{
    metadata::MarkerPredicate,
    paths::parent_path,
    tree::{Document, Folder},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkGraph<'a> {
    /// Nearest index file in a strict ancestor folder.
    pub parent: Option<&'a Document>,
    /// Nearest index files in sibling folder subtrees. `None` when there are none.
    pub children: Option<Vec<&'a Document>>,
    /// Sibling documents, excluding the document itself. `None` when there are none.
    pub files: Option<Vec<&'a Document>>,
}

/// Non-fatal findings made while resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveDiagnostic {
    /// More than one index file in `folder`; the first in child order was used as parent, or
    /// all of them were listed as children.
    MultipleIndexFiles { folder: String, paths: Vec<String> },
}

impl Display for ResolveDiagnostic {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ResolveDiagnostic::MultipleIndexFiles { folder, paths } => write!(
                f,
                "Multiple index files found inside folder '{}': {}",
                folder,
                paths.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution<'a> {
    pub graph: LinkGraph<'a>,
    pub diagnostics: Vec<ResolveDiagnostic>,
}

pub struct GraphResolver<'a> {
    root: &'a Folder,
    predicate: &'a MarkerPredicate,
}

impl<'a> GraphResolver<'a> {
    pub fn new(root: &'a Folder, predicate: &'a MarkerPredicate) -> Self {
        GraphResolver { root, predicate }
    }

    pub fn is_index_file(&self, doc: &Document) -> bool {
        self.predicate.is_marked(doc.metadata.as_ref())
    }

    /// Direct-child index files of `folder`, in child order. Not recursive.
    pub fn index_files_in(&self, folder: &'a Folder) -> Vec<&'a Document> {
        folder
            .documents()
            .filter(|doc| self.is_index_file(doc))
            .collect()
    }

    /// Every index file in the snapshot, folder by folder in depth-first order.
    pub fn all_index_files(&self) -> Vec<&'a Document> {
        self.root
            .all_folders()
            .into_iter()
            .flat_map(|folder| self.index_files_in(folder))
            .collect()
    }

    fn containing_folder(&self, doc_path: &str) -> &'a Folder {
        parent_path(doc_path)
            .and_then(|folder| self.root.find_folder(folder))
            .unwrap_or(self.root)
    }

    /// Walk the strict ancestors of the document's folder toward the root and return the
    /// first index file of the first ancestor holding any.
    pub fn resolve_parent(
        &self,
        doc_path: &str,
        diagnostics: &mut Vec<ResolveDiagnostic>,
    ) -> Option<&'a Document> {
        let own_folder = parent_path(doc_path)?;
        let mut current = parent_path(own_folder);
        while let Some(folder_path) = current {
            if let Some(folder) = self.root.find_folder(folder_path) {
                let found = self.index_files_in(folder);
                if found.len() > 1 {
                    let diagnostic = multiple(folder, &found);
                    tracing::warn!("[GraphResolver] {diagnostic}");
                    diagnostics.push(diagnostic);
                }
                if let Some(first) = found.first() {
                    return Some(*first);
                }
            }
            current = parent_path(folder_path);
        }
        None
    }

    /// Nearest index files below every sibling folder of the document. A folder holding an
    /// index file shadows everything nested under it.
    pub fn resolve_children(
        &self,
        doc_path: &str,
        diagnostics: &mut Vec<ResolveDiagnostic>,
    ) -> Option<Vec<&'a Document>> {
        let parent = self.containing_folder(doc_path);
        let mut children = Vec::new();
        for folder in parent.folders() {
            self.collect_nearest(folder, &mut children, diagnostics);
        }
        if children.is_empty() {
            None
        } else {
            Some(children)
        }
    }

    fn collect_nearest(
        &self,
        folder: &'a Folder,
        out: &mut Vec<&'a Document>,
        diagnostics: &mut Vec<ResolveDiagnostic>,
    ) {
        let found = self.index_files_in(folder);
        if found.is_empty() {
            for sub in folder.folders() {
                self.collect_nearest(sub, out, diagnostics);
            }
            return;
        }
        if found.len() > 1 {
            let diagnostic = multiple(folder, &found);
            tracing::warn!("[GraphResolver] {diagnostic}");
            diagnostics.push(diagnostic);
        }
        out.extend(found);
    }

    /// Documents sharing the document's folder, marked or not, excluding the document.
    pub fn resolve_files(&self, doc_path: &str) -> Option<Vec<&'a Document>> {
        let files: Vec<&'a Document> = self
            .containing_folder(doc_path)
            .documents()
            .filter(|doc| doc.path != doc_path)
            .collect();
        if files.is_empty() {
            None
        } else {
            Some(files)
        }
    }

    pub fn resolve_graph(&self, doc_path: &str) -> Resolution<'a> {
        let mut diagnostics = Vec::new();
        let graph = LinkGraph {
            parent: self.resolve_parent(doc_path, &mut diagnostics),
            children: self.resolve_children(doc_path, &mut diagnostics),
            files: self.resolve_files(doc_path),
        };
        Resolution { graph, diagnostics }
    }
}

fn multiple(folder: &Folder, found: &[&Document]) -> ResolveDiagnostic {
    ResolveDiagnostic::MultipleIndexFiles {
        folder: folder.path.clone(),
        paths: found.iter().map(|doc| doc.path.clone()).collect(),
    }
}
