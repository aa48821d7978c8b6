use std::{fmt, io, path::StripPrefixError, sync::mpsc::SendError};

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;

#[cfg(feature = "service")]
use notify::{Error as NotifyError, ErrorKind as NotifyErrorKind};

use crate::{event::Event, router::Notification};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum MocError {
    #[error("Region codec error: {0}")]
    Codec(String),
    #[error("Invalid Command: {0}")]
    Command(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Service error: {0}")]
    Service(String),
}

impl MocError {
    /// True for the transient case where a document vanished between notification and
    /// processing. Such failures are skipped rather than reported.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MocError::NotFound(_))
    }
}

impl From<StripPrefixError> for MocError {
    fn from(src: StripPrefixError) -> MocError {
        MocError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for MocError {
    fn from(src: toml::de::Error) -> MocError {
        MocError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for MocError {
    fn from(src: toml::ser::Error) -> MocError {
        MocError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for MocError {
    fn from(src: JsonError) -> MocError {
        MocError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<YamlError> for MocError {
    fn from(src: YamlError) -> MocError {
        MocError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<io::Error> for MocError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => MocError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => MocError::PermissionDenied,
            _ => MocError::Io(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for MocError {
    fn from(x: walkdir::Error) -> Self {
        match x.into_io_error() {
            Some(io_error) => MocError::from(io_error),
            None => MocError::Io("directory walk failed on a filesystem loop".to_string()),
        }
    }
}

impl From<fmt::Error> for MocError {
    fn from(x: fmt::Error) -> Self {
        MocError::Codec(format!("{x}"))
    }
}

impl From<RegexError> for MocError {
    fn from(x: RegexError) -> Self {
        MocError::Serialization(format!("Regex parse failed: {x}"))
    }
}

impl From<SendError<Event>> for MocError {
    fn from(x: SendError<Event>) -> Self {
        MocError::Io(format!(
            "Channel update send Error, could not transmit event {:?}",
            x.0
        ))
    }
}

impl From<TokioSendError<Notification>> for MocError {
    fn from(x: TokioSendError<Notification>) -> Self {
        MocError::Io(format!(
            "Channel update send Error, could not transmit notification {:?}",
            x.0
        ))
    }
}

#[cfg(feature = "service")]
impl From<NotifyError> for MocError {
    fn from(notify_error: NotifyError) -> Self {
        match notify_error.kind {
            NotifyErrorKind::Generic(msg) => MocError::Custom(format!(
                "notify-debouncer: {}, paths: {:?}",
                msg, notify_error.paths
            )),
            NotifyErrorKind::Io(io_error) => MocError::Custom(format!(
                "notify-debouncer: io error {}, paths: {:?}",
                io_error.kind(),
                notify_error.paths
            )),
            NotifyErrorKind::PathNotFound => MocError::NotFound(format!(
                "notify-debouncer: path(s) not found: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::WatchNotFound => MocError::NotFound(format!(
                "notify-debouncer: watch not found, paths: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::InvalidConfig(_) => {
                MocError::Custom("notify-debouncer invalid config".to_string())
            }
            NotifyErrorKind::MaxFilesWatch => {
                MocError::Custom("notify-debouncer max file watch limit reached".to_string())
            }
        }
    }
}
