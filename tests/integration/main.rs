//! Integration tests for precache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn precache() -> Command {
        cargo_bin_cmd!("precache")
    }

    /// A build directory served from `https://app.test/` and a config using it
    struct Project {
        dir: TempDir,
        config: PathBuf,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let dist = dir.path().join("dist");
            fs::create_dir_all(&dist).unwrap();
            fs::write(dist.join("index.html"), "<html>v1</html>").unwrap();
            fs::write(dist.join("app.js"), "app(1)").unwrap();
            fs::write(dist.join("logo.svg"), "<svg/>").unwrap();
            fs::write(dist.join("unlisted.txt"), "not in the manifest").unwrap();
            fs::write(
                dist.join("precache-manifest.json"),
                r#"{"/": "h0", "index.html": "h0", "app.js": "h1", "logo.svg": "h2"}"#,
            )
            .unwrap();
            fs::write(dist.join("precache-shell.json"), r#"["index.html", "app.js"]"#).unwrap();

            let config = dir.path().join("config.toml");
            fs::write(
                &config,
                format!(
                    r#"
[general]
journal_path = "{root}/journal.log"

[origin]
base_url = "https://app.test/"

[build]
manifest = "{root}/dist/precache-manifest.json"
shell = "{root}/dist/precache-shell.json"
source_dir = "{root}/dist"

[storage]
dir = "{root}/store"
"#,
                    root = dir.path().display()
                ),
            )
            .unwrap();

            Self { dir, config }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
            precache()
                .arg("--config")
                .arg(&self.config)
                .args(args)
                .assert()
        }
    }

    #[test]
    fn help_displays() {
        precache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline asset cache manager"));
    }

    #[test]
    fn version_displays() {
        precache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn config_path() {
        let project = Project::new();
        project
            .run(&["config", "path"])
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        precache()
            .arg("--config")
            .arg(dir.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[origin]"))
            .stdout(predicate::str::contains("precache-content"));
    }

    #[test]
    fn config_init_and_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let run = |args: &[&str]| {
            precache()
                .arg("--config")
                .arg(&path)
                .args(args)
                .assert()
        };

        run(&["config", "init"]).success();
        assert!(path.exists());
        run(&["config", "init"])
            .success()
            .stdout(predicate::str::contains("already exists"));

        run(&["config", "set", "origin.timeout_secs", "5"]).success();
        run(&["config", "show"])
            .success()
            .stdout(predicate::str::contains("timeout_secs = 5"));

        run(&["config", "set", "vm.name", "x"]).failure();
        run(&["config", "set", "origin.max_concurrent_fetches", "0"])
            .failure()
            .stderr(predicate::str::contains("Not saved"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[origin\n").unwrap();

        precache()
            .arg("--config")
            .arg(&path)
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn status_before_upgrade() {
        let project = Project::new();
        project
            .run(&["status"])
            .success()
            .stdout(predicate::str::contains("Content entries: 0"))
            .stdout(predicate::str::contains("next upgrade starts cold"))
            .stdout(predicate::str::contains("precache upgrade"));
    }

    #[test]
    fn upgrade_then_serve_from_cache() {
        let project = Project::new();
        project
            .run(&["upgrade"])
            .success()
            .stdout(predicate::str::contains("Staged 2 shell resource(s)"))
            .stdout(predicate::str::contains("cold start"));

        // Cache-first: a later change on disk is not seen until the next release
        fs::write(project.root().join("dist/app.js"), "app(2)").unwrap();
        project
            .run(&["get", "app.js?v=99"])
            .success()
            .stdout("app(1)");

        project
            .run(&["status"])
            .success()
            .stdout(predicate::str::contains("Activated: yes"))
            .stdout(predicate::str::contains("Cached: 2/4"));

        let journal = fs::read_to_string(project.root().join("journal.log")).unwrap();
        assert!(journal.contains("\"event\":\"install\""));
        assert!(journal.contains("\"event\":\"activate\""));
    }

    #[test]
    fn root_document_is_online_first() {
        let project = Project::new();
        project.run(&["upgrade"]).success();

        fs::write(project.root().join("dist/index.html"), "<html>v2</html>").unwrap();
        project
            .run(&["get", "/#/settings"])
            .success()
            .stdout("<html>v2</html>");
    }

    #[test]
    fn unlisted_resource_passes_through() {
        let project = Project::new();
        project
            .run(&["get", "unlisted.txt"])
            .success()
            .stdout("not in the manifest");
        project
            .run(&["status"])
            .success()
            .stdout(predicate::str::contains("Content entries: 0"));
    }

    #[test]
    fn get_writes_output_file() {
        let project = Project::new();
        let out = project.root().join("out.svg");
        project
            .run(&["get", "logo.svg", "--output", out.to_str().unwrap()])
            .success();
        assert_eq!(fs::read_to_string(out).unwrap(), "<svg/>");
    }

    #[test]
    fn get_missing_resource_fails() {
        let project = Project::new();
        fs::remove_file(project.root().join("dist/logo.svg")).unwrap();
        project
            .run(&["get", "logo.svg"])
            .failure()
            .stderr(predicate::str::contains("status 404"));
    }

    #[test]
    fn prefetch_fills_missing_resources() {
        let project = Project::new();
        project.run(&["upgrade"]).success();

        project
            .run(&["prefetch"])
            .success()
            .stdout(predicate::str::contains("Prefetched 2 resource(s)"));
        project
            .run(&["status"])
            .success()
            .stdout(predicate::str::contains("Cached: 4/4"));
        project
            .run(&["prefetch"])
            .success()
            .stdout(predicate::str::contains("already cached"));
    }

    #[test]
    fn upgrade_with_prefetch() {
        let project = Project::new();
        project
            .run(&["upgrade", "--prefetch"])
            .success()
            .stdout(predicate::str::contains("Prefetched 2 resource(s)"));
    }

    #[test]
    fn failed_install_leaves_cache_untouched() {
        let project = Project::new();
        project.run(&["upgrade"]).success();

        fs::remove_file(project.root().join("dist/app.js")).unwrap();
        project
            .run(&["upgrade"])
            .failure()
            .stderr(predicate::str::contains("Install failed"));

        project.run(&["get", "app.js"]).success().stdout("app(1)");
    }

    #[test]
    fn second_upgrade_evicts_changed_entries() {
        let project = Project::new();
        project.run(&["upgrade", "--prefetch"]).success();

        fs::write(project.root().join("dist/logo.svg"), "<svg v2/>").unwrap();
        fs::write(
            project.root().join("dist/precache-manifest.json"),
            r#"{"/": "h0", "index.html": "h0", "app.js": "h1", "logo.svg": "h3"}"#,
        )
        .unwrap();

        project
            .run(&["upgrade"])
            .success()
            .stdout(predicate::str::contains("diffed against previous release"))
            .stdout(predicate::str::contains("Evicted 1 stale entries"));
        project.run(&["get", "logo.svg"]).success().stdout("<svg v2/>");
    }

    #[test]
    fn reset_wipes_everything() {
        let project = Project::new();
        project.run(&["upgrade"]).success();

        project
            .run(&["reset"])
            .success()
            .stdout(predicate::str::contains("Reset cancelled"));
        project
            .run(&["reset", "--yes"])
            .success()
            .stdout(predicate::str::contains("Cache reset"));
        project
            .run(&["status"])
            .success()
            .stdout(predicate::str::contains("Content entries: 0"))
            .stdout(predicate::str::contains("next upgrade starts cold"));
    }
}
