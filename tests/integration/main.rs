//! Integration tests for genrepo

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const COMMIT: &str = "d1e524d09fab1e3498c84c26b264257496df6c4d";

    /// A config file pointing every root and store into a temp dir
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().display().to_string();
            let config = format!(
                r#"
[general]
audit_log = false

[rpm]
build_root = "{root}/yum"

[deb]
build_root = "{root}/apt"
repo_root = "{root}/repos"

[cache]
path = "{root}/results.json"
"#
            );
            std::fs::write(dir.path().join("config.toml"), config).unwrap();
            Self { dir }
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn genrepo(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("genrepo");
            cmd.env_remove("GENREPO_CONFIG")
                .env("XDG_STATE_HOME", self.path().join("state"))
                .env("XDG_CONFIG_HOME", self.path().join("xdg"))
                .arg("--config")
                .arg(self.config_path());
            cmd
        }

        fn rpm_build(&self, subpath: &str) {
            std::fs::create_dir_all(
                self.path()
                    .join(format!("yum/proj/commit/{COMMIT}-1/{subpath}")),
            )
            .unwrap();
        }
    }

    fn resolve_args<'a>(arch: &'a str, reference: &'a str) -> Vec<&'a str> {
        vec![
            "resolve",
            "--distro",
            "rhel",
            "--releasever",
            "6.5",
            "--arch",
            arch,
            "--url",
            "git@example.com:proj.git",
            "--ref",
            reference,
        ]
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("genrepo")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("locate built package repositories"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("genrepo")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("genrepo"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .genrepo()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .genrepo()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("retention_days = 7"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.config_path(), "[cache\n").unwrap();
        sandbox
            .genrepo()
            .args(["cache", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("genrepo config show"));
    }

    #[test]
    fn cache_list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .genrepo()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached results"));
    }

    #[test]
    fn amd64_is_rejected() {
        let sandbox = Sandbox::new();
        sandbox
            .genrepo()
            .args(resolve_args("amd64", "mybranch"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("try \"x86_64\" instead"));
    }

    #[test]
    fn resolve_full_hash() {
        let sandbox = Sandbox::new();
        sandbox.rpm_build("rhel/6/x86_64");

        sandbox
            .genrepo()
            .args(resolve_args("x86_64", COMMIT))
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                "http://192.168.51.243/yum/builds/proj/commit/{COMMIT}-1/rhel/6/x86_64"
            )));

        // Full hashes are never remembered
        sandbox
            .genrepo()
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn resolve_missing_platform_json() {
        let sandbox = Sandbox::new();
        sandbox.rpm_build("rhel/5/i386");

        let mut args = resolve_args("x86_64", COMMIT);
        args.extend(["--format", "json"]);
        sandbox
            .genrepo()
            .args(args)
            .assert()
            .failure()
            .stdout(predicate::str::contains("\"status\":404"))
            .stdout(predicate::str::contains("rhel/6/x86_64"));
    }

    #[test]
    fn serve_answers_stdin() {
        let sandbox = Sandbox::new();
        sandbox.rpm_build("rhel/6/x86_64");

        let found = format!(
            r#"{{"id":1,"distro":"rhel","releasever":"6","arch":"x86_64","url":"u","ref":"{COMMIT}"}}"#
        );
        let unknown =
            r#"{"id":2,"distro":"gentoo","releasever":"1","arch":"x86_64","url":"u","ref":"x"}"#;
        let input = format!("{found}\n{unknown}\n");
        sandbox
            .genrepo()
            .arg("serve")
            .write_stdin(input)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\":200"))
            .stdout(predicate::str::contains("unknown distro"));
    }

    #[test]
    fn cache_clear_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .genrepo()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached results to clear"));
    }
}
