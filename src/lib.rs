//! # moc-core
//!
//! Keeps "map of contents" (MOC) links up to date across a folder tree of Markdown documents.
//!
//! ## Overview
//!
//! Some documents are marked as **index files** through a key-value pair in their frontmatter
//! (`type: moc` by default). Each index file carries a machine-written block listing
//!
//! - its **parent**: the nearest index file in an ancestor folder,
//! - its **children**: the nearest index files inside its sibling folders, and
//! - its **files**: the other documents in its own folder.
//!
//! The block is regenerated whenever the tree changes. Renaming one folder makes the host
//! report a rename for every path beneath it, and the system's own corrective renames (emoji
//! prefixes, index file names) produce notifications of their own. Rename sessions and a
//! self-suppression set sort that stream into "one user gesture" plus bookkeeping, and
//! debounced triggers feeding per-document write lanes turn it into a bounded number of
//! writes.
//!
//! ## Architecture
//!
//! Leaves first:
//!
//! - **[`metadata`]**: frontmatter parsing and the index-file [`metadata::MarkerPredicate`]
//! - **[`resolver`]**: parent / children / files resolution over a [`tree::Folder`] snapshot
//! - **[`region`]**: encoding, locating and replacing the delimited block in document text
//! - **[`session`]**: rename sessions and the self-suppression set
//! - **[`scheduler`]**: trailing-edge debouncers and per-document write lanes
//! - **[`engine`]**: the update operations, run against a [`store::DocumentStore`]
//! - **[`router`]**: host notifications to scheduled jobs
//! - **[`watch`]**: filesystem watcher feeding a router (feature `service`)
//!
//! ## Quick Start
//!
//! Refresh every index file of a vault once:
//!
//! ```rust,no_run
//! use moc_core::{config::MocConfig, engine::MocEngine, event::EventSink, store::FsStore};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), moc_core::MocError> {
//!     let store = Arc::new(FsStore::new("./vault")?);
//!     let engine = MocEngine::new(store, MocConfig::default(), EventSink::disconnected());
//!     let report = engine.sync_all()?;
//!     println!("{} index files updated", report.updated.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: `service`
//! - **service**: file watching (`notify`)
//! - **bin**: the `moc` command line tool

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod metadata;
pub mod paths;
pub mod region;
pub mod resolver;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod store;
#[cfg(test)]
mod tests;
pub mod tree;
#[cfg(feature = "service")]
pub mod watch;

pub use error::*;
