//! Tests for rename session attribution and self-suppression

use crate::{
    session::{CoordinatorState, RenameClass},
    tree::NodeKind,
};
use std::time::Duration;
use test_log::test;
use tokio::time::Instant;

const TIMEOUT: Duration = Duration::from_millis(500);

fn state() -> CoordinatorState {
    CoordinatorState::new(TIMEOUT)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_folder_rename_coalesces_into_one_session() {
    let mut state = state();
    let t0 = Instant::now();
    let mut classes = vec![state.classify_rename("G", "F", NodeKind::Folder, t0)];
    for (idx, sub) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        classes.push(state.classify_rename(
            &format!("G/{sub}/Index.md"),
            &format!("F/{sub}/Index.md"),
            NodeKind::Document,
            t0 + ms(10 * idx as u64),
        ));
    }
    assert_eq!(classes[0], RenameClass::NewSession);
    assert_eq!(
        classes.iter().filter(|c| **c == RenameClass::Cascade).count(),
        5
    );
    assert_eq!(state.sessions_started(), 1);
    assert_eq!(state.session().unwrap().base_folder, "F");
}

#[test]
fn test_cascade_before_folder_notification() {
    let mut state = state();
    let t0 = Instant::now();
    let first = state.classify_rename("G/x.md", "F/x.md", NodeKind::Document, t0);
    let folder = state.classify_rename("G", "F", NodeKind::Folder, t0 + ms(1));
    assert_eq!(first, RenameClass::NewSession);
    assert_eq!(folder, RenameClass::Cascade);
}

#[test]
fn test_session_window_slides_then_expires() {
    let mut state = state();
    let t0 = Instant::now();
    state.classify_rename("G", "F", NodeKind::Folder, t0);
    // each cascade extends the window
    for step in 1..=4 {
        let class = state.classify_rename(
            &format!("G/{step}.md"),
            &format!("F/{step}.md"),
            NodeKind::Document,
            t0 + ms(400 * step),
        );
        assert_eq!(class, RenameClass::Cascade);
    }
    assert!(!state.expire(t0 + ms(1600 + 499)));
    assert!(state.expire(t0 + ms(1600 + 500)));
    assert!(!state.is_active());

    let class = state.classify_rename("G/late.md", "F/late.md", NodeKind::Document, t0 + ms(3000));
    assert_eq!(class, RenameClass::NewSession);
    assert_eq!(state.sessions_started(), 2);
}

#[test]
fn test_stale_session_expires_lazily() {
    let mut state = state();
    let t0 = Instant::now();
    state.classify_rename("G", "F", NodeKind::Folder, t0);
    let class = state.classify_rename("G/x.md", "F/x.md", NodeKind::Document, t0 + ms(900));
    assert_eq!(class, RenameClass::NewSession);
    assert_eq!(state.session().unwrap().base_folder, "F");
    assert_eq!(state.session().unwrap().started, t0 + ms(900));
}

#[test]
fn test_unrelated_rename_starts_new_session() {
    let mut state = state();
    let t0 = Instant::now();
    state.classify_rename("G", "F", NodeKind::Folder, t0);
    let class = state.classify_rename("Other/y.md", "Other/x.md", NodeKind::Document, t0 + ms(5));
    assert_eq!(class, RenameClass::NewSession);
    assert_eq!(state.session().unwrap().base_folder, "Other");
    // a prefix match on the name alone is not a descendant
    let class = state.classify_rename("FG", "Fx", NodeKind::Folder, t0 + ms(6));
    assert_eq!(class, RenameClass::NewSession);
}

#[test]
fn test_root_level_document_rename_does_not_swallow_everything() {
    let mut state = state();
    let t0 = Instant::now();
    let class = state.classify_rename("b.md", "a.md", NodeKind::Document, t0);
    assert_eq!(class, RenameClass::NewSession);
    assert_eq!(state.session().unwrap().base_folder, "");
    let class = state.classify_rename("Q", "P", NodeKind::Folder, t0 + ms(1));
    assert_eq!(class, RenameClass::NewSession);
}

#[test]
fn test_self_suppression_consumed_exactly_once() {
    let mut state = state();
    let t0 = Instant::now();
    state.register_system_rename("A/Old.md", "A/A.md", NodeKind::Document);
    assert!(state.is_suppressed("A/Old.md"));

    let class = state.classify_rename("A/A.md", "A/Old.md", NodeKind::Document, t0);
    assert_eq!(class, RenameClass::SelfInflicted);
    assert!(!state.is_active());
    assert_eq!(state.suppressed_len(), 0);

    // the same old path again is a user action
    let class = state.classify_rename("A/A.md", "A/Old.md", NodeKind::Document, t0 + ms(1));
    assert_eq!(class, RenameClass::NewSession);
}

#[test]
fn test_self_inflicted_leaves_session_untouched() {
    let mut state = state();
    let t0 = Instant::now();
    state.classify_rename("G", "F", NodeKind::Folder, t0);
    let before = state.session().cloned();
    state.register_system_rename("Elsewhere/x.md", "Elsewhere/y.md", NodeKind::Document);
    let class = state.classify_rename("Elsewhere/y.md", "Elsewhere/x.md", NodeKind::Document, t0 + ms(100));
    assert_eq!(class, RenameClass::SelfInflicted);
    assert_eq!(state.session().cloned(), before);
}

#[test]
fn test_consumed_suppression_no_longer_claims_renames() {
    let mut state = state();
    let t0 = Instant::now();
    state.register_system_rename("A/Old.md", "A/A.md", NodeKind::Document);
    assert!(state.consume_suppression("A/Old.md"));
    assert!(!state.consume_suppression("A/Old.md"));
    assert!(!state.is_active());

    let class = state.classify_rename("A/New.md", "A/Old.md", NodeKind::Document, t0);
    assert_eq!(class, RenameClass::NewSession);
}

#[test]
fn test_unregister_after_failed_rename() {
    let mut state = state();
    state.register_system_rename("A", "📁A", NodeKind::Folder);
    state.unregister_system_rename("A");
    let class = state.classify_rename("B", "A", NodeKind::Folder, Instant::now());
    assert_eq!(class, RenameClass::NewSession);
}

#[test]
fn test_emoji_rename_joins_active_session() {
    let mut state = state();
    let t0 = Instant::now();
    let user = state.classify_rename("ProjectsRenamed", "Projects", NodeKind::Folder, t0);
    assert_eq!(user, RenameClass::NewSession);

    // the system emoji-prefixes the folder while the user's session is live
    let joined = state.register_system_rename("Projects", "📁Projects", NodeKind::Folder);
    assert!(joined);
    assert_eq!(
        state.session().unwrap().plugin_renamed_folder.as_deref(),
        Some("📁Projects")
    );

    let folder = state.classify_rename("📁Projects", "Projects", NodeKind::Folder, t0 + ms(60));
    assert_eq!(folder, RenameClass::SelfInflicted);
    let cascade = state.classify_rename(
        "📁Projects/A/Index.md",
        "📁Projects/A/Index-old.md",
        NodeKind::Document,
        t0 + ms(70),
    );
    assert_eq!(cascade, RenameClass::Cascade);
    let late = state.classify_rename(
        "📁Projects/B/B.md",
        "ProjectsRenamed/B/B.md",
        NodeKind::Document,
        t0 + ms(80),
    );
    assert_eq!(late, RenameClass::Cascade);
    assert_eq!(state.sessions_started(), 1);
}

#[test]
fn test_system_rename_outside_session_is_not_folded() {
    let mut state = state();
    let t0 = Instant::now();
    state.classify_rename("G", "F", NodeKind::Folder, t0);
    assert!(!state.register_system_rename("Other", "📁Other", NodeKind::Folder));
    assert!(state.session().unwrap().plugin_renamed_folder.is_none());
}
