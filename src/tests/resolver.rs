//! Tests for parent / children / files resolution

use super::helpers::*;
use crate::resolver::{GraphResolver, ResolveDiagnostic};
use test_log::test;

#[test]
fn test_projects_scenario() {
    let vault = projects_vault();
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);

    let resolution = resolver.resolve_graph("Projects/Index.md");
    assert!(resolution.diagnostics.is_empty());
    let graph = resolution.graph;
    assert!(graph.parent.is_none());
    assert_eq!(
        paths(graph.children),
        Some(vec!["Projects/A/Index.md", "Projects/B/Index.md"])
    );
    assert_eq!(paths(graph.files), Some(vec!["Projects/notes.md"]));

    let child = resolver.resolve_graph("Projects/A/Index.md").graph;
    assert_eq!(
        child.parent.map(|doc| doc.path.as_str()),
        Some("Projects/Index.md")
    );
    assert!(child.children.is_none());
    assert!(child.files.is_none());
}

#[test]
fn test_parent_is_nearest_ancestor() {
    let vault = root(vec![
        index("Root.md"),
        folder(
            "A",
            vec![
                folder(
                    "A/B",
                    vec![folder("A/B/C", vec![index("A/B/C/C.md"), doc("A/B/C/note.md")])],
                ),
                index("A/A.md"),
            ],
        ),
    ]);
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);
    let mut diagnostics = Vec::new();

    let parent = resolver.resolve_parent("A/B/C/C.md", &mut diagnostics);
    assert_eq!(parent.map(|doc| doc.path.as_str()), Some("A/A.md"));
    let parent = resolver.resolve_parent("A/A.md", &mut diagnostics);
    assert_eq!(parent.map(|doc| doc.path.as_str()), Some("Root.md"));
    assert!(resolver.resolve_parent("Root.md", &mut diagnostics).is_none());
    assert!(diagnostics.is_empty());
}

#[test]
fn test_own_folder_is_never_the_parent() {
    let vault = root(vec![folder(
        "A",
        vec![index("A/First.md"), index("A/Second.md")],
    )]);
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);
    let mut diagnostics = Vec::new();
    assert!(resolver
        .resolve_parent("A/Second.md", &mut diagnostics)
        .is_none());
    assert!(diagnostics.is_empty());
}

#[test]
fn test_children_shadowing() {
    let vault = root(vec![
        folder(
            "A",
            vec![folder(
                "A/X",
                vec![folder("A/X/Y", vec![index("A/X/Y/Y.md")]), index("A/X/X.md")],
            )],
        ),
        index("Index.md"),
    ]);
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);
    let mut diagnostics = Vec::new();
    let children = resolver.resolve_children("Index.md", &mut diagnostics);
    assert_eq!(paths(children), Some(vec!["A/X/X.md"]));

    let below = resolver.resolve_children("A/X/X.md", &mut diagnostics);
    assert_eq!(paths(below), Some(vec!["A/X/Y/Y.md"]));
}

#[test]
fn test_children_depth_first_across_unmarked_folders() {
    let vault = root(vec![
        folder(
            "A",
            vec![
                folder("A/P", vec![index("A/P/P.md")]),
                folder("A/Q", vec![folder("A/Q/R", vec![index("A/Q/R/R.md")])]),
            ],
        ),
        folder("B", vec![index("B/B.md")]),
        index("Index.md"),
    ]);
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);
    let children = resolver.resolve_graph("Index.md").graph.children;
    assert_eq!(
        paths(children),
        Some(vec!["A/P/P.md", "A/Q/R/R.md", "B/B.md"])
    );
}

#[test]
fn test_files_exclude_self_and_include_unmarked() {
    let vault = root(vec![
        index("Index.md"),
        doc("image.png"),
        doc("note.md"),
    ]);
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);
    let files = resolver.resolve_files("Index.md");
    assert_eq!(paths(files), Some(vec!["image.png", "note.md"]));
    let files = resolver.resolve_files("note.md").unwrap();
    assert!(files.iter().all(|doc| doc.path != "note.md"));
    assert!(files.iter().any(|doc| doc.path == "Index.md"));
}

#[test]
fn test_multiple_markers_pick_first_and_report() {
    let vault = root(vec![
        folder(
            "A",
            vec![
                folder("A/Sub", vec![index("A/Sub/Sub.md")]),
                index("A/One.md"),
                index("A/Two.md"),
            ],
        ),
        index("Index.md"),
    ]);
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);

    let resolution = resolver.resolve_graph("A/Sub/Sub.md");
    assert_eq!(
        resolution.graph.parent.map(|doc| doc.path.as_str()),
        Some("A/One.md")
    );
    assert_eq!(
        resolution.diagnostics,
        vec![ResolveDiagnostic::MultipleIndexFiles {
            folder: "A".to_string(),
            paths: vec!["A/One.md".to_string(), "A/Two.md".to_string()],
        }]
    );

    let resolution = resolver.resolve_graph("Index.md");
    assert_eq!(
        paths(resolution.graph.children),
        Some(vec!["A/One.md", "A/Two.md"])
    );
    assert_eq!(resolution.diagnostics.len(), 1);
}

#[test]
fn test_all_index_files_depth_first() {
    let vault = projects_vault();
    let predicate = predicate();
    let resolver = GraphResolver::new(&vault, &predicate);
    let all: Vec<&str> = resolver
        .all_index_files()
        .iter()
        .map(|doc| doc.path.as_str())
        .collect();
    assert_eq!(
        all,
        vec!["Projects/Index.md", "Projects/A/Index.md", "Projects/B/Index.md"]
    );
}
