//! Rename sessions and the self-suppression set.
//!
//! Renaming one folder makes the host report a rename for the folder and for every path below
//! it. [`CoordinatorState::classify_rename`] groups that burst into one [`RenameSession`] so
//! that only the first notification drives recomputation and corrective renames. Renames the
//! system issues itself are registered beforehand with
//! [`CoordinatorState::register_system_rename`] and recognised when their notification
//! arrives, which keeps corrective renames from looping.
//!
//! The state is plain data behind a lock owned by the router. Every method is synchronous;
//! callers never hold the lock across a suspension point.
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

use crate::{
    paths::{is_within, parent_path},
    tree::NodeKind,
};

/// How a rename notification was attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameClass {
    /// The old path was pre-registered by a system rename. Session state is untouched.
    SelfInflicted,
    /// First notification of a user gesture.
    NewSession,
    /// Side effect of the active session's gesture; bookkeeping only.
    Cascade,
}

// every path lies beneath the root, so a root base would swallow unrelated renames
fn beneath(path: &str, base: &str) -> bool {
    !base.is_empty() && is_within(path, base)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSession {
    /// Old path of the folder the user renamed, or the folder holding a renamed document.
    pub base_folder: String,
    /// Where the system's own corrective rename moved the base folder to, if it did.
    pub plugin_renamed_folder: Option<String>,
    pub started: Instant,
    /// Time of the last attributable notification; the quiet interval counts from here.
    pub last_seen: Instant,
    pub processed: HashSet<String>,
    /// Distinguishes sessions so a stale expiry timer cannot end a newer session.
    pub generation: u64,
}

impl RenameSession {
    /// True if a rename away from `old_path` belongs to this session's gesture.
    pub fn attributes(&self, old_path: &str) -> bool {
        if self.processed.contains(old_path) {
            return true;
        }
        beneath(old_path, &self.base_folder)
            || self
                .plugin_renamed_folder
                .as_deref()
                .is_some_and(|folder| beneath(old_path, folder))
            || self.processed.iter().any(|p| beneath(old_path, p))
    }

    fn record(&mut self, old_path: &str, new_path: &str, now: Instant) {
        self.processed.insert(old_path.to_string());
        self.processed.insert(new_path.to_string());
        self.last_seen = now;
    }

    pub fn deadline(&self, timeout: Duration) -> Instant {
        self.last_seen + timeout
    }
}

#[derive(Debug)]
pub struct CoordinatorState {
    session: Option<RenameSession>,
    suppressed: HashSet<String>,
    timeout: Duration,
    generation: u64,
    sessions_started: u64,
}

impl CoordinatorState {
    pub fn new(timeout: Duration) -> Self {
        CoordinatorState {
            session: None,
            suppressed: HashSet::new(),
            timeout,
            generation: 0,
            sessions_started: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> Option<&RenameSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    pub fn is_suppressed(&self, old_path: &str) -> bool {
        self.suppressed.contains(old_path)
    }

    pub fn suppressed_len(&self) -> usize {
        self.suppressed.len()
    }

    /// Attribute one rename notification. Any session whose quiet interval has passed by
    /// `now` is expired first.
    pub fn classify_rename(
        &mut self,
        new_path: &str,
        old_path: &str,
        kind: NodeKind,
        now: Instant,
    ) -> RenameClass {
        if self.suppressed.remove(old_path) {
            tracing::debug!("[RenameSession] consumed suppression for {old_path}");
            return RenameClass::SelfInflicted;
        }
        self.expire(now);

        if let Some(session) = self.session.as_mut() {
            if session.attributes(old_path) {
                session.record(old_path, new_path, now);
                tracing::debug!(
                    "[RenameSession] cascade {old_path} -> {new_path} (base {})",
                    session.base_folder
                );
                return RenameClass::Cascade;
            }
        }

        let base_folder = match kind {
            NodeKind::Folder => old_path.to_string(),
            NodeKind::Document => parent_path(old_path).unwrap_or("").to_string(),
        };
        self.generation += 1;
        self.sessions_started += 1;
        let mut session = RenameSession {
            base_folder,
            plugin_renamed_folder: None,
            started: now,
            last_seen: now,
            processed: HashSet::new(),
            generation: self.generation,
        };
        session.record(old_path, new_path, now);
        tracing::debug!(
            "[RenameSession] new session #{} based at '{}'",
            session.generation,
            session.base_folder
        );
        self.session = Some(session);
        RenameClass::NewSession
    }

    /// Note that the system is about to rename `old_path` to `new_path`. Must be called before
    /// the rename is issued. A folder rename of the active session's base (or of a path it
    /// already processed) is folded into that session. Returns whether it was.
    pub fn register_system_rename(
        &mut self,
        old_path: &str,
        new_path: &str,
        kind: NodeKind,
    ) -> bool {
        self.suppressed.insert(old_path.to_string());
        if kind != NodeKind::Folder {
            return false;
        }
        match self.session.as_mut() {
            Some(session)
                if session.base_folder == old_path || session.processed.contains(old_path) =>
            {
                session.plugin_renamed_folder = Some(new_path.to_string());
                session.processed.insert(old_path.to_string());
                session.processed.insert(new_path.to_string());
                true
            }
            _ => false,
        }
    }

    /// Withdraw a registration whose rename failed, so no later user rename of the same path
    /// is mistaken for the system's.
    pub fn unregister_system_rename(&mut self, old_path: &str) {
        self.suppressed.remove(old_path);
    }

    /// Drop the registration for `old_path` without classifying anything: its rename was
    /// reported in a form that never reaches [`CoordinatorState::classify_rename`]. Returns
    /// whether there was one.
    pub fn consume_suppression(&mut self, old_path: &str) -> bool {
        let consumed = self.suppressed.remove(old_path);
        if consumed {
            tracing::debug!("[RenameSession] dropped suppression for {old_path}");
        }
        consumed
    }

    /// End the active session if its quiet interval has passed. Returns true if it did.
    pub fn expire(&mut self, now: Instant) -> bool {
        let stale = self
            .session
            .as_ref()
            .is_some_and(|session| now >= session.deadline(self.timeout));
        if stale {
            self.clear();
        }
        stale
    }

    /// Deadline of the active session, with its generation, for arming an expiry timer.
    pub fn expiry(&self) -> Option<(u64, Instant)> {
        self.session
            .as_ref()
            .map(|session| (session.generation, session.deadline(self.timeout)))
    }

    pub fn clear(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(
                "[RenameSession] session #{} ended after {} paths",
                session.generation,
                session.processed.len()
            );
        }
    }
}
