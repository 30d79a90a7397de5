//! End-to-end tests for the `workflow-sync` binary.
//!
//! Provider traffic goes to a local mock API; only the test gated on the
//! `integration-tests` feature reaches a real provider.

mod common;

use common::prelude::*;

const GIT_URL: &str = "git@github.com:org/repo.git";

fn mock_repo() -> MockProvider {
    let mock = MockProvider::start();
    mock.mount_github_repo(
        "org/repo",
        &[("master", "aaa"), ("broken", "bbb")],
        &[
            ("master", "/Dockstore.cwl", descriptors::CWL_WORKFLOW),
            ("master", "/tools/count.cwl", descriptors::CWL_TOOL),
            ("broken", "/Dockstore.cwl", descriptors::CWL_MISSING_CLASS),
        ],
    );
    mock.route(
        "/repos/org/repo",
        Reply::json(r#"{"full_name":"org/repo","default_branch":"master"}"#),
    );
    mock
}

#[test]
fn test_help_lists_commands() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("default-version"))
        .stdout(predicate::str::contains("imports"));
}

#[test]
fn test_stub_then_status() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["stub", GIT_URL, "--language", "wdl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("github.com/org/repo [WDL workflow STUB]"));
    assert!(fixture.state_dir().exists());

    fixture
        .command()
        .args(["status", GIT_URL])
        .assert()
        .success()
        .stdout(predicate::str::contains("publishable: no"));

    fixture
        .command()
        .args(["stub", GIT_URL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already registered"))
        .stderr(predicate::str::contains("restub"));
}

#[test]
fn test_status_of_unknown_entry_hints_at_registration() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["status", GIT_URL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No entry registered"))
        .stderr(predicate::str::contains("workflow-sync stub"));
}

#[test]
fn test_unsupported_host_is_rejected() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["stub", "git@example.com:org/repo.git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let fixture = TestFixture::new();
    cargo_bin_cmd!("workflow-sync")
        .current_dir(fixture.path())
        .env_remove("WORKFLOW_SYNC_CONFIG")
        .arg("--config")
        .arg(fixture.path().join("absent.yaml"))
        .args(["status", GIT_URL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_publish_without_valid_version_is_refused() {
    let fixture = TestFixture::new();
    fixture.command().args(["stub", GIT_URL]).assert().success();
    fixture
        .command()
        .args(["publish", GIT_URL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no valid version"))
        .stderr(predicate::str::contains("workflow-sync status"));
}

#[test]
fn test_refresh_against_provider() {
    let mock = mock_repo();
    let fixture = TestFixture::new().with_github(&mock);

    fixture
        .command()
        .args(["refresh", GIT_URL])
        .assert()
        .success()
        .stdout(predicate::str::contains("[CWL workflow FULL] default=master"))
        .stdout(predicate::str::is_match(r"master\s+BRANCH\s+valid").unwrap())
        .stdout(predicate::str::is_match(r"broken\s+BRANCH\s+invalid").unwrap())
        .stdout(predicate::str::contains("/Dockstore.cwl: Requires class: Workflow."));

    fixture
        .command()
        .args(["status", GIT_URL])
        .assert()
        .success()
        .stdout(predicate::str::contains("description: Counts words"))
        .stdout(predicate::str::contains("publishable: yes"));

    fixture
        .command()
        .args(["imports", GIT_URL, "master"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/Dockstore.cwl"))
        .stdout(predicate::str::contains("/tools/count.cwl"));

    fixture
        .command()
        .args(["publish", GIT_URL])
        .assert()
        .success()
        .stdout(predicate::str::contains("github.com/org/repo is published"));

    fixture
        .command()
        .args(["restub", GIT_URL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("published"));
}

#[test]
fn test_default_version_suggests_close_name() {
    let mock = mock_repo();
    let fixture = TestFixture::new().with_github(&mock);
    fixture.command().args(["refresh", GIT_URL]).assert().success();

    fixture
        .command()
        .args(["default-version", GIT_URL, "mastr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Did you mean 'master'?"));

    fixture
        .command()
        .args(["default-version", GIT_URL, "broken"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default version of github.com/org/repo is now broken"));
}

#[test]
fn test_rejected_token_explains_how_to_reconnect() {
    let mock = MockProvider::start();
    mock.route("/repos/org/repo/branches?per_page=100", Reply::status(401));
    let fixture = TestFixture::new().with_github(&mock);

    fixture
        .command()
        .args(["refresh", GIT_URL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reconnect"))
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn test_status_json_is_machine_readable() {
    let fixture = TestFixture::new();
    fixture.command().args(["stub", GIT_URL]).assert().success();
    let output = fixture
        .command()
        .args(["status", GIT_URL, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["descriptor_language"], "cwl");
    assert_eq!(value["git_url"], GIT_URL);
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_repos_without_token_on_github() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["repos", "github"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}
