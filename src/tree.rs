//! Snapshot of the vault's folder hierarchy.
//!
//! A [`Folder`] owns its children; nothing points back up the tree, so traversals that need a
//! parent derive it from the path (see [`crate::paths::parent_path`]). Snapshots are taken
//! fresh for each operation and never patched in place.
use serde_json::{Map, Value};

use crate::paths::{self, TRIM};

/// A document's key-value metadata block.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    /// `None` when the document has no (parseable) metadata block.
    pub metadata: Option<Metadata>,
}

impl Document {
    pub fn new(path: impl Into<String>, metadata: Option<Metadata>) -> Self {
        Document {
            path: path.into(),
            metadata,
        }
    }

    pub fn name(&self) -> &str {
        paths::file_name(&self.path)
    }

    pub fn stem(&self) -> &str {
        paths::file_stem(&self.path)
    }

    pub fn folder_path(&self) -> &str {
        paths::parent_path(&self.path).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Folder {
    pub path: String,
    pub children: Vec<TreeNode>,
}

/// Whether a notification or rename concerns a document or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Folder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Document(Document),
    Folder(Folder),
}

impl TreeNode {
    pub fn path(&self) -> &str {
        match self {
            TreeNode::Document(doc) => &doc.path,
            TreeNode::Folder(folder) => &folder.path,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            TreeNode::Document(_) => NodeKind::Document,
            TreeNode::Folder(_) => NodeKind::Folder,
        }
    }
}

impl Folder {
    pub fn new(path: impl Into<String>) -> Self {
        Folder {
            path: path.into(),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn name(&self) -> &str {
        paths::file_name(&self.path)
    }

    pub fn parent_path(&self) -> Option<&str> {
        paths::parent_path(&self.path)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.children.iter().filter_map(|child| match child {
            TreeNode::Document(doc) => Some(doc),
            TreeNode::Folder(_) => None,
        })
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.children.iter().filter_map(|child| match child {
            TreeNode::Folder(folder) => Some(folder),
            TreeNode::Document(_) => None,
        })
    }

    /// Look up a folder by its vault path, starting from this folder.
    pub fn find_folder(&self, path: &str) -> Option<&Folder> {
        let rest = if self.is_root() {
            path.trim_matches(TRIM)
        } else if path == self.path {
            ""
        } else {
            path.strip_prefix(self.path.as_str())?.strip_prefix(TRIM)?
        };
        let mut current = self;
        for segment in rest.split(TRIM).filter(|s| !s.is_empty()) {
            current = current
                .folders()
                .find(|folder| folder.name() == segment)?;
        }
        Some(current)
    }

    pub fn find_document(&self, path: &str) -> Option<&Document> {
        let folder = self.find_folder(paths::parent_path(path)?)?;
        folder.documents().find(|doc| doc.path == path)
    }

    /// This folder followed by every folder beneath it, depth first in child order.
    pub fn all_folders(&self) -> Vec<&Folder> {
        let mut out = vec![self];
        let mut idx = 0;
        while idx < out.len() {
            let current = out[idx];
            // keep depth-first order by splicing children right after their parent
            let children: Vec<&Folder> = current.folders().collect();
            for (offset, child) in children.into_iter().enumerate() {
                out.insert(idx + 1 + offset, child);
            }
            idx += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn sample() -> Folder {
        Folder {
            path: String::new(),
            children: vec![
                TreeNode::Folder(Folder {
                    path: "A".to_string(),
                    children: vec![
                        TreeNode::Folder(Folder::new("A/B")),
                        TreeNode::Document(Document::new("A/note.md", None)),
                    ],
                }),
                TreeNode::Folder(Folder::new("C")),
                TreeNode::Document(Document::new("root.md", None)),
            ],
        }
    }

    #[test]
    fn test_find_folder_and_document() {
        let root = sample();
        assert_eq!(root.find_folder("").map(|f| f.path.as_str()), Some(""));
        assert_eq!(root.find_folder("A/B").map(|f| f.path.as_str()), Some("A/B"));
        assert!(root.find_folder("A/missing").is_none());
        assert!(root.find_document("A/note.md").is_some());
        assert!(root.find_document("root.md").is_some());
        assert!(root.find_document("A/other.md").is_none());

        let a = root.find_folder("A").unwrap();
        assert_eq!(a.find_folder("A/B").map(|f| f.path.as_str()), Some("A/B"));
        assert!(a.find_folder("C").is_none());
    }

    #[test]
    fn test_all_folders_depth_first() {
        let root = sample();
        let order: Vec<&str> = root.all_folders().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(order, vec!["", "A", "A/B", "C"]);
    }
}
