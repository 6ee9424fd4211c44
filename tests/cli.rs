use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use steward::config::Settings;

fn steward(base: &Path) -> Command {
    let mut cmd = Command::cargo_bin("steward").unwrap();
    cmd.env("BACKUP_STEWARD_DIR", base)
        .env_remove("STEWARD_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Initialize a steward directory whose backup includes one source folder
fn initialized(base: &TempDir, source: &TempDir) -> PathBuf {
    steward(base.path()).arg("init").assert().success();

    fs::write(source.path().join("notes.txt"), "remember the milk").unwrap();
    fs::create_dir_all(source.path().join("docs")).unwrap();
    fs::write(source.path().join("docs").join("plan.md"), "# plan").unwrap();

    let config = base.path().join("config.yaml");
    let mut settings = Settings::load(&config).unwrap();
    settings.backup.source.include = vec![source.path().to_path_buf()];
    settings.backup.source.relative_path = Some(source.path().to_path_buf());
    settings.save(&config).unwrap();

    base.path().join("backups").join("backup-steward")
}

fn archives_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|name| name.ends_with(".zip"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn test_help() {
    let base = TempDir::new().unwrap();
    steward(base.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("monitor"));
}

#[test]
fn test_init_writes_config_once() {
    let base = TempDir::new().unwrap();

    steward(base.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings written to"));
    assert!(base.path().join("config.yaml").exists());
    assert!(base.path().join("backups").is_dir());

    steward(base.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    steward(base.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn test_config_shows_paths() {
    let base = TempDir::new().unwrap();
    steward(base.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Event journal"))
        .stdout(predicate::str::contains("keep_all_backups_for_days: 7"));
}

#[test]
fn test_backup_to_local_disk() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let folder = initialized(&base, &source);

    steward(base.path())
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created"))
        .stdout(predicate::str::contains("2 file(s)"));

    assert_eq!(archives_in(&folder).len(), 1);
    let leftovers = fs::read_dir(base.path().join("tmp")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_backup_with_custom_filename() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let folder = initialized(&base, &source);

    steward(base.path())
        .args(["backup", "--filename", "manual.zip"])
        .assert()
        .success();

    assert_eq!(archives_in(&folder), vec!["manual.zip"]);
}

#[test]
fn test_conflicting_backup_flags_fail() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let folder = initialized(&base, &source);

    steward(base.path())
        .args(["backup", "--only-db", "--only-files"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only-db"));

    assert!(archives_in(&folder).is_empty());
}

#[test]
fn test_monitor_reports_missing_backups() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    initialized(&base, &source);

    steward(base.path())
        .arg("monitor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("There are no backups"))
        .stderr(predicate::str::contains("unhealthy"));
}

#[test]
fn test_monitor_after_backup_is_healthy() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    initialized(&base, &source);

    steward(base.path()).arg("backup").assert().success();
    steward(base.path())
        .arg("monitor")
        .assert()
        .success()
        .stdout(predicate::str::contains("All backup destinations are healthy"));
}

#[test]
fn test_list_shows_destinations() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    initialized(&base, &source);

    steward(base.path()).arg("backup").assert().success();
    steward(base.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup-steward"))
        .stdout(predicate::str::contains("local"));
}

#[test]
fn test_cleanup_keeps_the_only_backup() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let folder = initialized(&base, &source);

    steward(base.path()).arg("backup").assert().success();
    steward(base.path())
        .arg("cleanup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 0 backup(s)"));

    assert_eq!(archives_in(&folder).len(), 1);
}

#[test]
fn test_events_are_journaled() {
    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    initialized(&base, &source);

    steward(base.path())
        .arg("events")
        .assert()
        .success()
        .stdout(predicate::str::contains("No events recorded yet"));

    steward(base.path()).arg("backup").assert().success();
    steward(base.path())
        .arg("events")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup_copied"))
        .stdout(predicate::str::contains("action_succeeded"));

    steward(base.path())
        .args(["events", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing 1 of 4 event(s)"));
}
