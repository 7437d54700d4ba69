//! Integration tests for stagecache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn stagecache(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("stagecache");
        cmd.current_dir(dir).env_remove("STAGECACHE_CONFIG");
        cmd
    }

    fn project(config: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("stagecache.toml"), config).unwrap();
        temp
    }

    const CONFIG: &str = r#"
[project]
name = "app"

[docker]
from = "busybox:latest"

[shell]
commands = ["echo hello"]
"#;

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        stagecache(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("staged container image builds"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        stagecache(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecache"));
    }

    #[test]
    fn stages_plain_lists_both_stages() {
        let temp = project(CONFIG);
        stagecache(temp.path())
            .args(["stages", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"(?m)^from [0-9a-f]{64}$").unwrap())
            .stdout(predicate::str::is_match(r"(?m)^shell [0-9a-f]{64}$").unwrap());
    }

    #[test]
    fn stages_are_stable_across_runs() {
        let temp = project(CONFIG);
        let first = stagecache(temp.path())
            .args(["stages", "--format", "plain"])
            .output()
            .unwrap();
        let second = stagecache(temp.path())
            .args(["stages", "--format", "plain"])
            .output()
            .unwrap();
        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn stages_json_shows_dependencies() {
        let temp = project(CONFIG);
        let output = stagecache(temp.path())
            .args(["stages", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let stages: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(stages[0]["name"], "from");
        assert_eq!(stages[0]["dependencies"][0], "busybox:latest");
        assert!(stages[0]["dependencies"][1].is_null());
        assert_eq!(stages[1]["name"], "shell");
        assert_eq!(stages[1]["dependencies"][0], stages[0]["signature"]);
        assert_eq!(stages[1]["dependencies"][1][0], "echo hello");
        assert!(stages[1]["image"]
            .as_str()
            .unwrap()
            .starts_with("app-stage:"));
    }

    #[test]
    fn stages_found_from_subdirectory() {
        let temp = project(CONFIG);
        let nested = temp.path().join("src");
        std::fs::create_dir_all(&nested).unwrap();

        stagecache(&nested)
            .args(["stages", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("shell "));
    }

    #[test]
    fn stages_without_config_uses_scratch() {
        let temp = TempDir::new().unwrap();
        stagecache(temp.path())
            .args(["stages", "--format", "table"])
            .assert()
            .success()
            .stdout(predicate::str::contains("from"))
            .stdout(predicate::str::contains("shell").not());
    }

    #[test]
    fn missing_explicit_config_fails() {
        let temp = TempDir::new().unwrap();
        stagecache(temp.path())
            .args(["-c", "missing.toml", "stages"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = project("[project]\nname = \"Bad Name\"\n");
        stagecache(temp.path())
            .arg("stages")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn export_requires_name() {
        let temp = TempDir::new().unwrap();
        stagecache(temp.path()).arg("export").assert().failure();
    }
}
