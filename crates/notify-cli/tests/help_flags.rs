use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_commands_and_global_flags() {
    let output = std::process::Command::new(assert_cmd::cargo::cargo_bin!("notifyd"))
        .arg("--help")
        .output()
        .expect("run help");
    assert!(output.status.success(), "--help should succeed");
    let text = String::from_utf8_lossy(&output.stdout);

    for needle in ["store", "worker", "check", "watch", "push", "--dry-run", "--portal-url"] {
        assert!(
            text.contains(needle),
            "help output should contain '{needle}'"
        );
    }
}

#[test]
fn check_help_mentions_accounts_and_notify() {
    Command::new(assert_cmd::cargo::cargo_bin!("notifyd"))
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--accounts").and(predicate::str::contains("--notify")));
}

#[test]
fn push_requires_token_title_and_body() {
    Command::new(assert_cmd::cargo::cargo_bin!("notifyd"))
        .args(["push", "--title", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--token"));
}

#[test]
fn dry_run_push_prints_delivery_result() {
    Command::new(assert_cmd::cargo::cargo_bin!("notifyd"))
        .args([
            "--dry-run",
            "push",
            "--token",
            "ExponentPushToken[cli]",
            "--title",
            "Results ready",
            "--body",
            "Open the app",
        ])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success":true"#));
}

#[test]
fn check_reports_missing_accounts_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("accounts.json");
    Command::new(assert_cmd::cargo::cargo_bin!("notifyd"))
        .args(["check", "--accounts"])
        .arg(&missing)
        .env_remove("NOTIFY_ACCOUNTS")
        .assert()
        .failure()
        .stderr(predicate::str::contains("read accounts file"));
}

#[test]
fn check_with_empty_account_list_succeeds_offline() {
    let dir = tempfile::tempdir().unwrap();
    let accounts = dir.path().join("accounts.json");
    std::fs::write(&accounts, "[]").unwrap();
    Command::new(assert_cmd::cargo::cargo_bin!("notifyd"))
        .args(["--dry-run", "check", "--accounts"])
        .arg(&accounts)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""totalUsers":0"#));
}
