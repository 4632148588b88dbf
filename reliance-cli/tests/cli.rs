#![cfg(not(miri))]

use assert_cmd::Command;
use assert_fs::{fixture::ChildPath, prelude::*, TempDir};
use dir_test::{dir_test, Fixture};
use predicates::prelude::*;

fn rules_file(dir: &TempDir, content: &str) -> ChildPath {
    let file = dir.child("rules.rls");
    file.write_str(content).unwrap();
    file
}

fn rely() -> Command {
    let mut command = Command::cargo_bin("rely").unwrap();
    command.env_remove("RELY_STRATEGY").env_remove("RELY_TIMEOUT");
    command
}

#[test]
fn positive_graph_as_json() {
    let dir = TempDir::new().unwrap();
    let file = rules_file(
        &dir,
        "a(?x, !v) :- b(?x, ?y) .
         c(?x, ?y) :- a(?x, ?y) .",
    );

    rely()
        .arg(file.path())
        .arg("positive")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"edges\": 1"))
        .stdout(predicate::str::contains("\"timeout\": false"))
        .stdout(predicate::str::contains("\"pruned_dependencies\": 0"));
}

#[test]
fn restraint_graph_export() {
    let dir = TempDir::new().unwrap();
    let file = rules_file(
        &dir,
        "h(?x, !v) :- b(?x) .
         h(?x, ?y) :- a(?x, ?y) .",
    );
    let export = dir.child("restraint.csv");

    rely()
        .arg(file.path())
        .arg("restraint")
        .arg("--export")
        .arg(export.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("restraint reliances"));

    export.assert("1,0\n");
}

#[test]
fn self_restraint_breaks_core_stratification() {
    let dir = TempDir::new().unwrap();
    let file = rules_file(&dir, "h(?x, !v), r(?x) :- b(?x) .");
    let graphml = dir.child("graph.graphml");

    rely()
        .arg(file.path())
        .arg("core-stratified")
        .arg("--graphml")
        .arg(graphml.path())
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stratified\": false"))
        .stdout(predicate::str::contains("h(?x, !v), r(?x) :- b(?x) ."));

    graphml.assert(predicate::str::contains("<graphml"));
}

#[test]
fn grd_acyclic() {
    let dir = TempDir::new().unwrap();
    let file = rules_file(
        &dir,
        "b(?x, ?y) :- a(?x, ?y) .
         a(?x, !v) :- b(?x, ?y) .",
    );

    rely()
        .arg(file.path())
        .arg("grd")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"acyclic\": true"));
}

#[test]
fn pieces_are_printed() {
    let dir = TempDir::new().unwrap();
    let file = rules_file(&dir, "h(?x, !v), r(?x) :- b(?x) .");

    rely()
        .arg(file.path())
        .arg("pieces")
        .assert()
        .success()
        .stdout(predicate::eq("h(?x, !v) :- b(?x) .\nr(?x) :- b(?x) .\n"));
}

#[test]
fn missing_file() {
    let dir = TempDir::new().unwrap();

    rely()
        .arg(dir.child("missing.rls").path())
        .arg("grd")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn invalid_strategy() {
    let dir = TempDir::new().unwrap();
    let file = rules_file(&dir, "b(?x) :- a(?x) .");

    rely()
        .arg(file.path())
        .arg("positive")
        .arg("--strategy")
        .arg("16")
        .assert()
        .failure();
}

#[dir_test(
    dir: "$CARGO_MANIFEST_DIR/../resources/testcases/reliances",
    glob: "*.rls",
)]
fn fixtures_are_analysed(fixture: Fixture<&str>) {
    rely()
        .arg(fixture.path())
        .arg("core-stratified")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stratified\""));
}
