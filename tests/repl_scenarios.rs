//! End-to-end REPL scenarios driven through in-memory input and output
//! buffers against a real database file.

use std::fmt::Write as _;
use std::path::Path;

use pagedb::cli::Repl;
use pagedb::Table;
use tempfile::tempdir;

const BANNER: &str = "Simple SQLite\n---------------------\n";

fn run_script(path: &Path, script: &str) -> String {
    let table = Table::open(path).unwrap();
    let mut out = Vec::new();
    Repl::new(table, script.as_bytes(), &mut out).run().unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn empty_select() {
    let dir = tempdir().unwrap();

    let output = run_script(&dir.path().join("test.db"), "select\n.exit\n");

    assert_eq!(output, format!("{}db > Executed.\ndb > ", BANNER));
}

#[test]
fn insert_then_select() {
    let dir = tempdir().unwrap();

    let output = run_script(
        &dir.path().join("test.db"),
        "insert 1 alice a@x\nselect\n.exit\n",
    );

    assert_eq!(
        output,
        format!(
            "{}db > Executed.\ndb > (1, alice, a@x)\nExecuted.\ndb > ",
            BANNER
        )
    );
}

#[test]
fn duplicate_key_is_rejected() {
    let dir = tempdir().unwrap();

    let output = run_script(
        &dir.path().join("test.db"),
        "insert 1 a a\ninsert 1 b b\n.exit\n",
    );

    assert_eq!(
        output,
        format!(
            "{}db > Executed.\ndb > Error: Duplicate key.\ndb > ",
            BANNER
        )
    );
}

#[test]
fn select_sorts_unsorted_inserts() {
    let dir = tempdir().unwrap();

    let output = run_script(
        &dir.path().join("test.db"),
        "insert 3 c c\ninsert 1 a a\ninsert 2 b b\nselect\n.exit\n",
    );

    assert_eq!(
        output,
        format!(
            "{}db > Executed.\ndb > Executed.\ndb > Executed.\n\
             db > (1, a, a)\n(2, b, b)\n(3, c, c)\nExecuted.\ndb > ",
            BANNER
        )
    );
}

#[test]
fn leaf_split_shows_in_btree_output() {
    let dir = tempdir().unwrap();

    let mut script = String::new();
    for id in 1..=14 {
        writeln!(script, "insert {} user{} user{}@test", id, id, id).unwrap();
    }
    script.push_str(".btree\nselect\n.exit\n");

    let output = run_script(&dir.path().join("test.db"), &script);

    let mut expected_tree = String::from("Tree:\n- internal (size 1)\n  - leaf (size 7)\n");
    for id in 1..=7 {
        writeln!(expected_tree, "    - {}", id).unwrap();
    }
    expected_tree.push_str("  - key 7\n  - leaf (size 7)\n");
    for id in 8..=14 {
        writeln!(expected_tree, "    - {}", id).unwrap();
    }
    assert!(
        output.contains(&expected_tree),
        "missing tree block in output:\n{}",
        output
    );

    let mut expected_rows = String::new();
    for id in 1..=14 {
        writeln!(expected_rows, "({}, user{}, user{}@test)", id, id, id).unwrap();
    }
    assert!(
        output.contains(&expected_rows),
        "missing sorted rows in output:\n{}",
        output
    );
}

#[test]
fn rows_persist_across_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let first = run_script(
        &path,
        "insert 2 bob b@x\ninsert 1 alice a@x\ninsert 3 carol c@x\n.exit\n",
    );
    assert_eq!(first.matches("Executed.").count(), 3);

    let second = run_script(&path, "select\n.exit\n");

    assert_eq!(
        second,
        format!(
            "{}db > (1, alice, a@x)\n(2, bob, b@x)\n(3, carol, c@x)\nExecuted.\ndb > ",
            BANNER
        )
    );
}

#[test]
fn table_full_after_internal_root_fills() {
    let dir = tempdir().unwrap();

    let mut script = String::new();
    for id in 1..=35 {
        writeln!(script, "insert {} user{} user{}@test", id, id, id).unwrap();
    }
    script.push_str(".exit\n");

    let output = run_script(&dir.path().join("test.db"), &script);

    assert_eq!(output.matches("Executed.").count(), 34);
    assert!(output.ends_with("Error: Table full.\ndb > "));
}

#[test]
fn username_at_column_width_is_accepted() {
    let dir = tempdir().unwrap();

    let script = format!("insert 1 {} e@x\n.exit\n", "u".repeat(32));
    let output = run_script(&dir.path().join("test.db"), &script);

    assert!(output.contains("Executed.\n"));
}

#[test]
fn overlong_username_is_rejected() {
    let dir = tempdir().unwrap();

    let script = format!("insert 1 {} e@x\n.exit\n", "u".repeat(33));
    let output = run_script(&dir.path().join("test.db"), &script);

    assert!(output.contains("String is too long.\n"));
    assert!(!output.contains("Executed."));
}

#[test]
fn overlong_email_is_rejected() {
    let dir = tempdir().unwrap();

    let script = format!("insert 1 alice {}\n.exit\n", "e".repeat(256));
    let output = run_script(&dir.path().join("test.db"), &script);

    assert!(output.contains("String is too long.\n"));
}

#[test]
fn syntax_error_keeps_the_loop_running() {
    let dir = tempdir().unwrap();

    let output = run_script(
        &dir.path().join("test.db"),
        "insert 1 alice\ninsert 1 alice a@x\n.exit\n",
    );

    assert_eq!(
        output,
        format!(
            "{}db > Syntax error. Could not parse statement.\ndb > Executed.\ndb > ",
            BANNER
        )
    );
}

#[test]
fn constants_meta_command() {
    let dir = tempdir().unwrap();

    let output = run_script(&dir.path().join("test.db"), ".constants\n.exit\n");

    assert!(output.contains(
        "Constants:\n\
         ROW_SIZE: 291\n\
         COMMON_NODE_HEADER_SIZE: 6\n\
         LEAF_NODE_HEADER_SIZE: 14\n\
         LEAF_NODE_CELL_SIZE: 295\n\
         LEAF_NODE_SPACE_FOR_CELLS: 4082\n\
         LEAF_NODE_MAX_CELLS: 13\n"
    ));
}
