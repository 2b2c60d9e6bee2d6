mod support;

use serde_json::json;
use taskmaster::tags::all_tags;
use taskmaster::tree::{build_tree, TreeNode};
use taskmaster::{Error, NewTask, PathPrefix, Status};

use support::{path, TestStore};

#[test]
fn missing_project_asymmetry() {
    let ts = TestStore::new();
    let store = ts.store();
    store
        .create(&path("proj/a.md"), NewTask::new("A").tags(["x"]))
        .unwrap();

    assert!(all_tags(&store, Some("missing")).unwrap().is_empty());
    let scope = PathPrefix::parse("missing").unwrap();
    assert!(matches!(
        build_tree(&store, Some(&scope)),
        Err(Error::ProjectNotFound(name)) if name == "missing"
    ));
}

#[test]
fn tree_serializes_with_node_types() {
    let ts = TestStore::new();
    let store = ts.store();
    store
        .create(
            &path("proj/sub/a.md"),
            NewTask::new("A").status(Status::Done).tags(["x"]),
        )
        .unwrap();

    let scope = PathPrefix::parse("proj").unwrap();
    let tree = build_tree(&store, Some(&scope)).unwrap();
    assert_eq!(
        serde_json::to_value(&tree).unwrap(),
        json!({
            "type": "folder",
            "name": "proj",
            "children": [{
                "type": "folder",
                "name": "sub",
                "children": [{
                    "type": "task",
                    "name": "a.md",
                    "path": "proj/sub/a.md",
                    "title": "A",
                    "status": "done",
                    "priority": "medium",
                    "tags": ["x"]
                }]
            }]
        })
    );
}

#[test]
fn tree_follows_moves_and_deletes() {
    let ts = TestStore::new();
    let store = ts.store();
    store.create(&path("proj/todo/a.md"), NewTask::new("A")).unwrap();
    store.create(&path("proj/todo/b.md"), NewTask::new("B")).unwrap();
    store
        .move_task(&path("proj/todo/a.md"), &path("proj/done/a.md"))
        .unwrap();
    store.delete(&path("proj/todo/b.md")).unwrap();

    let tree = build_tree(&store, None).unwrap();
    let proj = &tree.children()[0];
    let folders: Vec<&str> = proj.children().iter().map(TreeNode::name).collect();
    assert_eq!(folders, ["done"]);
    assert_eq!(tree.task_count(), 1);
}

#[test]
fn tags_union_ignores_unreadable_cards() {
    let ts = TestStore::new();
    let store = ts.store();
    store
        .create(&path("web/a.md"), NewTask::new("A").tags(["ui"]))
        .unwrap();
    ts.write_task_file("web/broken.md", "+++\ntags = 5\n+++\n");
    store
        .create(&path("api/b.md"), NewTask::new("B").tags(["db", "ui"]))
        .unwrap();

    let tags: Vec<String> = all_tags(&store, None).unwrap().into_iter().collect();
    assert_eq!(tags, ["db", "ui"]);
    let web: Vec<String> = all_tags(&store, Some("web")).unwrap().into_iter().collect();
    assert_eq!(web, ["ui"]);
}
