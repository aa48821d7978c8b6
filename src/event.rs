use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    sync::mpsc::Sender,
};

use crate::error::MocError;

/// User-facing notifications: what the system changed, and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// An index file's region block was rewritten.
    LinksUpdated { path: String },
    /// An index file was created for a new folder.
    IndexCreated { path: String },
    /// The system renamed a folder or an index file.
    Renamed { from: String, to: String },
    /// Non-fatal finding, such as several index files in one folder.
    Anomaly { message: String },
    /// An update was abandoned.
    Failure { operation: String, message: String },
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Event::LinksUpdated { path } => write!(f, "MOC links updated: {path}"),
            Event::IndexCreated { path } => write!(f, "Index file created: {path}"),
            Event::Renamed { from, to } => write!(f, "Renamed {from} -> {to}"),
            Event::Anomaly { message } => write!(f, "Warning: {message}"),
            Event::Failure { operation, message } => write!(f, "{operation} failed: {message}"),
        }
    }
}

/// Optional channel end for [`Event`]s. Sending never fails the caller.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<Event>>,
}

impl EventSink {
    pub fn new(tx: Sender<Event>) -> Self {
        EventSink { tx: Some(tx) }
    }

    pub fn disconnected() -> Self {
        EventSink { tx: None }
    }

    pub fn emit(&self, event: Event) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.send(event) {
            let e = MocError::from(e);
            tracing::debug!("Event receiver dropped: {e}");
        }
    }
}
