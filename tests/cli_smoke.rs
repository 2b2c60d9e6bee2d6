mod support;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

use support::{tm_cmd, TestStore};

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("json envelope")
}

#[test]
fn taskmaster_help_works() {
    Command::cargo_bin("taskmaster")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("task cards"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "create", "show", "update", "delete", "move", "list", "tree", "search", "tags",
        "project", "serve",
    ];

    for cmd in subcommands {
        Command::cargo_bin("taskmaster")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn create_show_search_round_trip() {
    let ts = TestStore::new();

    let created = json_output(tm_cmd(&ts).args([
        "create",
        "proj/x.md",
        "--title",
        "Auth",
        "--content",
        "token check token",
        "--tag",
        "Backend,security",
        "--json",
    ]));
    assert_eq!(created["schema_version"], "taskmaster.v1");
    assert_eq!(created["command"], "create");
    assert_eq!(created["status"], "success");
    assert_eq!(created["data"]["path"], "proj/x.md");
    assert_eq!(created["data"]["tags"], serde_json::json!(["backend", "security"]));
    assert!(ts.tasks_dir().join("proj").join("x.md").is_file());

    let shown = json_output(tm_cmd(&ts).args(["show", "x.md", "--project", "proj", "--json"]));
    assert_eq!(shown["data"]["content"], "token check token");

    let found = json_output(tm_cmd(&ts).args(["search", "token", "--json"]));
    assert_eq!(found["data"]["total"], 1);
    assert_eq!(found["data"]["results"][0]["score"], 2);
    assert!(found["data"]["results"][0]["snippet"]
        .as_str()
        .unwrap()
        .contains("token check token"));
    assert!(found["data"]["results"][0].get("content").is_none());
}

#[test]
fn human_output_goes_to_stdout() {
    let ts = TestStore::new();
    tm_cmd(&ts)
        .args(["create", "proj/a.md", "--title", "First card"])
        .assert()
        .success()
        .stdout(contains("Task created"))
        .stdout(contains("proj/a.md"));

    tm_cmd(&ts)
        .args(["list"])
        .assert()
        .success()
        .stdout(contains("First card"));

    tm_cmd(&ts)
        .args(["-q", "list"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn errors_map_to_exit_codes() {
    let ts = TestStore::new();

    tm_cmd(&ts)
        .args(["create", "no-project.md", "--title", "A"])
        .assert()
        .code(2)
        .stderr(contains("error: Invalid path"));

    tm_cmd(&ts)
        .args(["create", "proj/a.md", "--title", "A", "--status", "someday"])
        .assert()
        .code(2)
        .stderr(contains("hint: status is one of"));

    tm_cmd(&ts)
        .args(["show", "proj/missing.md"])
        .assert()
        .code(3);

    let output = tm_cmd(&ts)
        .args(["tree", "ghost", "--json"])
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("error envelope");
    assert_eq!(value["status"], "error");
    assert_eq!(value["command"], "tree");
    assert_eq!(value["error"]["kind"], "project_not_found");
    assert_eq!(value["error"]["code"], 3);
}

#[test]
fn update_move_delete_via_cli() {
    let ts = TestStore::new();
    tm_cmd(&ts)
        .args(["create", "proj/todo/a.md", "--title", "A", "--tag", "x"])
        .assert()
        .success();

    let updated = json_output(tm_cmd(&ts).args([
        "update",
        "proj/todo/a.md",
        "--status",
        "in-progress",
        "--add-tag",
        "y",
        "--remove-tag",
        "x",
        "--json",
    ]));
    assert_eq!(updated["data"]["status"], "in-progress");
    assert_eq!(updated["data"]["tags"], serde_json::json!(["y"]));

    let moved = json_output(tm_cmd(&ts).args([
        "move",
        "todo/a.md",
        "done/a.md",
        "-p",
        "proj",
        "--json",
    ]));
    assert_eq!(moved["data"]["path"], "proj/done/a.md");
    assert_eq!(moved["data"]["created"], updated["data"]["created"]);

    tm_cmd(&ts)
        .args(["delete", "proj/done/a.md"])
        .assert()
        .success();
    tm_cmd(&ts)
        .args(["delete", "proj/done/a.md"])
        .assert()
        .code(3);
    assert!(!ts.tasks_dir().join("proj").exists());
}

#[test]
fn projects_tree_and_tags() {
    let ts = TestStore::new();
    tm_cmd(&ts).args(["project", "new", "empty"]).assert().success();
    tm_cmd(&ts)
        .args(["project", "new", "empty"])
        .assert()
        .code(3);
    tm_cmd(&ts)
        .args(["create", "web/ui/nav.md", "--title", "Nav", "--tag", "ui"])
        .assert()
        .success();

    let projects = json_output(tm_cmd(&ts).args(["project", "list", "--json"]));
    assert_eq!(projects["command"], "project list");
    assert_eq!(projects["data"]["projects"], serde_json::json!(["empty", "web"]));

    let tree = json_output(tm_cmd(&ts).args(["tree", "--json"]));
    assert_eq!(tree["data"]["name"], "root");
    assert_eq!(tree["data"]["children"][0]["name"], "empty");
    assert_eq!(tree["data"]["children"][1]["children"][0]["name"], "ui");

    let tags = json_output(tm_cmd(&ts).args(["tags", "--json"]));
    assert_eq!(tags["data"]["tags"]["ui"], 1);
    let none = json_output(tm_cmd(&ts).args(["tags", "--project", "missing", "--json"]));
    assert_eq!(none["data"]["total"], 0);
}

#[test]
fn tasks_dir_flag_overrides_default() {
    let ts = TestStore::new();
    let elsewhere = ts.path().join("elsewhere");
    tm_cmd(&ts)
        .arg("--tasks-dir")
        .arg(&elsewhere)
        .args(["create", "proj/a.md", "--title", "A"])
        .assert()
        .success();
    assert!(elsewhere.join("proj").join("a.md").is_file());
    assert!(!ts.tasks_dir().join("proj").exists());
}
