use predicates::prelude::*;
use serde_json::{Value, json};

use crate::common::TestProject;

#[test]
fn test_render_prints_html() {
    let project = TestProject::new().unwrap();
    let settings = project
        .write_json(
            "settings.json",
            &json!({
                "heading": "Title",
                "sub": { "component": "child", "settings": { "title": "X" } }
            }),
        )
        .unwrap();

    project
        .command()
        .args(["render", "parent", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout("<div class=\"parent\">Title<span class=\"child\">X</span></div>\n");
}

#[test]
fn test_render_to_file_with_language() {
    let project = TestProject::new().unwrap();
    project
        .registry()
        .add("hello", "1.0.0", &json!({ "name": "hello", "version": "1.0.0", "template": "hello.html" }))
        .unwrap();
    project.registry().add_file("hello", "1.0.0", "hello.html", "{{ lang }}:{{ context.user }}").unwrap();
    let context = project.write_json("context.json", &json!({ "language": "de" })).unwrap();
    let output = project.work_path().join("out.html");

    project
        .command()
        .args(["render", "hello", "--language", "en", "--context"])
        .arg(&context)
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template error").or(predicate::str::contains("hello:1.0.0")));

    project.registry().add_file("hello", "1.0.0", "hello.html", "{{ lang }}").unwrap();
    project
        .command()
        .args(["render", "hello", "--language", "en", "--context"])
        .arg(&context)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "en");
}

#[test]
fn test_resolve_json() {
    let project = TestProject::new().unwrap();
    let output = project.command().args(["resolve", "conflicted", "--format", "json"]).assert().success();

    let parsed: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(
        parsed["components"],
        json!([
            { "name": "alpha", "version": "1.5.0" },
            { "name": "beta", "version": "1.0.0" },
            { "name": "conflicted", "version": "1.0.0" }
        ])
    );
    assert_eq!(parsed["discarded"], json!(["alpha:1.0.0"]));
}

#[test]
fn test_list() {
    let project = TestProject::new().unwrap();
    project
        .command()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha: 2.0.0, 1.5.0, 1.0.0"))
        .stdout(predicate::str::contains("dummy: 0.0.1"));
}

#[test]
fn test_unknown_component_suggests_and_fails() {
    let project = TestProject::new().unwrap();
    project
        .command()
        .args(["render", "dumy"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Component 'dumy' (*) not found"))
        .stderr(predicate::str::contains("Did you mean: dummy?"));
}

#[test]
fn test_install_dry_run_then_install() {
    let project = TestProject::new().unwrap();
    let source = project.work_path().join("src");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(
        source.join("diversity.json"),
        json!({ "name": "fresh", "version": "0.2.0", "script": ["fresh.js"] }).to_string(),
    )
    .unwrap();
    std::fs::write(source.join("fresh.js"), "var fresh;\n").unwrap();
    let installed = project.registry().path().join("fresh/0.2.0");

    project
        .command()
        .args(["--mode", "dryrun", "install"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed fresh 0.2.0"));
    assert!(!installed.exists());

    project.command().arg("install").arg(&source).assert().success();
    assert!(installed.join("fresh.js").is_file());

    project
        .command()
        .args(["uninstall", "fresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled fresh 0.2.0"));
    assert!(!installed.exists());
}

#[test]
fn test_invalid_requirement_is_reported() {
    let project = TestProject::new().unwrap();
    project
        .command()
        .args(["resolve", "alpha", "--version", "latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid version requirement"));
}
