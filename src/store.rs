//! Store and metadata-index collaborators.
//!
//! The core only talks to the document store through [`DocumentStore`]; [`FsStore`] is the
//! implementation over a directory on disk used by the CLI and the watch service.
use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::MocError,
    metadata::parse_frontmatter,
    paths::{self, string_to_os_path},
    tree::{Document, Folder, Metadata, TreeNode},
};

/// Reads a document's metadata block without the document body.
pub trait MetadataIndex: Send + Sync {
    fn metadata(&self, path: &str) -> Option<Metadata>;
}

pub trait DocumentStore: MetadataIndex {
    fn read(&self, path: &str) -> Result<String, MocError>;

    /// Replace the text of an existing document. A missing document is `MocError::NotFound`,
    /// never recreated.
    fn write(&self, path: &str, text: &str) -> Result<(), MocError>;

    /// Create a new document. Fails if `path` is already taken.
    fn create(&self, path: &str, text: &str) -> Result<(), MocError>;

    /// Move a document or folder. Fails if `new_path` is already taken.
    fn rename(&self, path: &str, new_path: &str) -> Result<(), MocError>;

    fn exists(&self, path: &str) -> bool;

    fn is_folder(&self, path: &str) -> bool;

    /// Direct children of `folder`, in the store's iteration order. Child folders are returned
    /// without their own children.
    fn list_children(&self, folder: &str) -> Result<Vec<TreeNode>, MocError>;

    /// Full snapshot of the tree below (and including) `folder`.
    fn snapshot(&self, folder: &str) -> Result<Folder, MocError> {
        let mut out = Folder::new(folder);
        for child in self.list_children(folder)? {
            match child {
                TreeNode::Folder(sub) => {
                    let sub = self.snapshot(&sub.path)?;
                    out.children.push(TreeNode::Folder(sub));
                }
                doc => out.children.push(doc),
            }
        }
        Ok(out)
    }

    fn root(&self) -> Result<Folder, MocError> {
        self.snapshot("")
    }
}

/// A vault rooted at a directory. Entries whose name starts with `.` are invisible; children
/// are listed in byte order of their names.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

impl FsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, MocError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(MocError::NotFound(format!(
                "Vault root is not a directory: {root:?}"
            )));
        }
        Ok(FsStore { root })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn abs(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(string_to_os_path(path))
        }
    }

    fn read_frontmatter_lines(&self, path: &str) -> Result<Option<String>, MocError> {
        let file = fs::File::open(self.abs(path))?;
        let mut reader = BufReader::new(file);
        let mut block = String::new();
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0
            || line.trim_start_matches('\u{feff}').trim_end() != "---"
        {
            return Ok(None);
        }
        block.push_str(&line);
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            block.push_str(&line);
            if line.trim_end() == "---" {
                return Ok(Some(block));
            }
        }
    }
}

impl MetadataIndex for FsStore {
    fn metadata(&self, path: &str) -> Option<Metadata> {
        if paths::extension(path) != Some("md") {
            return None;
        }
        match self.read_frontmatter_lines(path) {
            Ok(Some(block)) => parse_frontmatter(&block),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Could not read metadata for {path}: {e}");
                None
            }
        }
    }
}

impl DocumentStore for FsStore {
    fn read(&self, path: &str) -> Result<String, MocError> {
        tracing::debug!("Reading {path}");
        Ok(fs::read_to_string(self.abs(path))?)
    }

    fn write(&self, path: &str, text: &str) -> Result<(), MocError> {
        tracing::debug!("Writing {path}");
        // no create: a document renamed away since it was read must stay gone
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.abs(path))?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    fn create(&self, path: &str, text: &str) -> Result<(), MocError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.abs(path))
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    MocError::Command(format!("Document already exists: {path}"))
                }
                _ => MocError::from(e),
            })?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    fn rename(&self, path: &str, new_path: &str) -> Result<(), MocError> {
        if self.exists(new_path) {
            return Err(MocError::Command(format!(
                "Cannot rename {path} to {new_path}: destination exists"
            )));
        }
        Ok(fs::rename(self.abs(path), self.abs(new_path))?)
    }

    fn exists(&self, path: &str) -> bool {
        self.abs(path).exists()
    }

    fn is_folder(&self, path: &str) -> bool {
        self.abs(path).is_dir()
    }

    fn list_children(&self, folder: &str) -> Result<Vec<TreeNode>, MocError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.abs(folder))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if is_hidden(&name) {
                continue;
            }
            let is_dir = entry.file_type()?.is_dir();
            entries.push((name, is_dir));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(entries
            .into_iter()
            .map(|(name, is_dir)| {
                let path = paths::path_join(folder, &name);
                if is_dir {
                    TreeNode::Folder(Folder::new(path))
                } else {
                    let metadata = self.metadata(&path);
                    TreeNode::Document(Document::new(path, metadata))
                }
            })
            .collect())
    }
}
