//! Integration tests for composer-cnb

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn composer_cnb() -> Command {
        let mut cmd = cargo_bin_cmd!("composer-cnb");
        cmd.env_remove("COMPOSER")
            .env_remove("COMPOSER_VENDOR_DIR")
            .env_remove("BP_COMPOSER_INSTALL_OPTIONS")
            .env_remove("BP_COMPOSER_INSTALL_GLOBAL")
            .env_remove("COMPOSER_GITHUB_OAUTH_TOKEN");
        cmd
    }

    fn app_with_composer_json(root: &Path) -> std::path::PathBuf {
        let app = root.join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("composer.json"), r#"{"require":{"php":"^7.4"}}"#).unwrap();
        app
    }

    #[test]
    fn help_displays() {
        composer_cnb()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("PHP Composer"));
    }

    #[test]
    fn version_displays() {
        composer_cnb()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("composer-cnb"));
    }

    #[test]
    fn detect_passes_and_writes_plan() {
        let temp = TempDir::new().unwrap();
        let app = app_with_composer_json(temp.path());
        let plan = temp.path().join("plan.toml");

        composer_cnb()
            .arg("detect")
            .arg(temp.path().join("platform"))
            .arg(&plan)
            .arg("--app-dir")
            .arg(&app)
            .assert()
            .success();

        let content = std::fs::read_to_string(&plan).unwrap();
        assert!(content.contains("name = \"php-composer\""));
        assert!(content.contains("version = \"^7.4\""));
        assert!(content.contains("launch = true"));
    }

    #[test]
    fn detect_fails_without_composer_json() {
        let temp = TempDir::new().unwrap();

        composer_cnb()
            .arg("detect")
            .arg(temp.path().join("platform"))
            .arg(temp.path().join("plan.toml"))
            .arg("--app-dir")
            .arg(temp.path())
            .assert()
            .code(100)
            .stdout(predicate::str::contains("no \"composer.json\" found at"));
    }

    #[test]
    fn detect_fails_on_malformed_buildpack_yml() {
        let temp = TempDir::new().unwrap();
        let app = app_with_composer_json(temp.path());
        std::fs::write(app.join("buildpack.yml"), "composer: [").unwrap();

        composer_cnb()
            .arg("detect")
            .arg(temp.path().join("platform"))
            .arg(temp.path().join("plan.toml"))
            .arg("--app-dir")
            .arg(&app)
            .assert()
            .code(100);
    }

    #[test]
    fn detect_reads_platform_env() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("app");
        std::fs::create_dir_all(app.join("backend")).unwrap();
        std::fs::write(app.join("backend/composer.json"), "{}").unwrap();
        let platform = temp.path().join("platform");
        std::fs::create_dir_all(platform.join("env")).unwrap();
        std::fs::write(platform.join("env/COMPOSER"), "backend/composer.json").unwrap();

        composer_cnb()
            .arg("detect")
            .arg(&platform)
            .arg(temp.path().join("plan.toml"))
            .arg("--app-dir")
            .arg(&app)
            .assert()
            .success();
    }

    #[test]
    fn build_skips_when_not_requested() {
        let temp = TempDir::new().unwrap();
        let app = app_with_composer_json(temp.path());
        let layers = temp.path().join("layers");
        std::fs::create_dir_all(&layers).unwrap();
        let plan = temp.path().join("plan.toml");
        std::fs::write(&plan, "[[entries]]\nname = \"php\"\n").unwrap();

        composer_cnb()
            .arg("build")
            .arg(&layers)
            .arg(temp.path().join("platform"))
            .arg(&plan)
            .arg("--app-dir")
            .arg(&app)
            .assert()
            .success();

        assert_eq!(std::fs::read_dir(&layers).unwrap().count(), 0);
    }

    #[test]
    fn build_reports_missing_phar() {
        let temp = TempDir::new().unwrap();
        let app = app_with_composer_json(temp.path());
        let php_home = temp.path().join("php");
        std::fs::create_dir_all(php_home.join("lib/php/extensions/no-debug-non-zts-20190902"))
            .unwrap();
        let plan = temp.path().join("plan.toml");
        std::fs::write(&plan, "[[entries]]\nname = \"php-composer\"\n").unwrap();

        composer_cnb()
            .arg("build")
            .arg(temp.path().join("layers"))
            .arg(temp.path().join("platform"))
            .arg(&plan)
            .arg("--app-dir")
            .arg(&app)
            .env("PHP_HOME", &php_home)
            .env("BP_COMPOSER_PHAR", temp.path().join("missing/composer.phar"))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("composer.phar not found"))
            .stderr(predicate::str::contains("Hint:"));
    }
}

mod build_tests {
    use php_composer_cnb::cli::commands::build::{build, BuildDirs, BuildOutcome};
    use php_composer_cnb::config::BuildEnv;
    use php_composer_cnb::credentials::{CredentialGate, RateLimitClient};
    use php_composer_cnb::fingerprint::Fingerprint;
    use php_composer_cnb::layer::{Contribution, Layers};
    use php_composer_cnb::runner::{RecordingRunner, RunOutput};
    use php_composer_cnb::ComposerResult;
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingGithub {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RateLimitClient for CountingGithub {
        async fn rate_limit(&self, _token: &str) -> ComposerResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "resources": { "core": { "remaining": 4999 } } }))
        }
    }

    struct Workspace {
        _temp: TempDir,
        root: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().to_path_buf();
            let write = |rel: &str, content: &str| {
                let path = root.join(rel);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, content).unwrap();
            };

            write("app/composer.json", r#"{"require":{"monolog/monolog":"^2.0"}}"#);
            write("app/composer.lock", r#"{"packages":[{"name":"monolog/monolog"}]}"#);
            write("buildpack/dependencies/composer.phar", "phar");
            write("plan.toml", "[[entries]]\nname = \"php-composer\"\n");
            std::fs::create_dir_all(root.join("php/lib/php/extensions/no-debug-non-zts-20190902"))
                .unwrap();
            std::fs::create_dir_all(root.join("layers")).unwrap();

            Self { _temp: temp, root }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.root.join(rel)
        }

        fn dirs(&self) -> BuildDirs {
            BuildDirs {
                app: self.path("app"),
                layers: self.path("layers"),
                plan: self.path("plan.toml"),
            }
        }

        fn env(&self, extra: &[(&str, &str)]) -> BuildEnv {
            let mut vars = vec![
                ("CNB_BUILDPACK_DIR".to_string(), self.path("buildpack").display().to_string()),
                ("PHP_HOME".to_string(), self.path("php").display().to_string()),
            ];
            vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
            BuildEnv::from_vars(vars)
        }
    }

    fn is_symlink(path: &Path) -> bool {
        std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn full_build_records_lock_fingerprint() {
        let ws = Workspace::new();
        let runner = Arc::new(RecordingRunner::new().with_output(
            "check-platform-reqs",
            RunOutput::exited(2, "ext-gd n/a monolog/monolog requires ext-gd (*) missing\n", ""),
        ));
        let github = Arc::new(CountingGithub::default());
        let env = ws.env(&[
            ("COMPOSER_GITHUB_OAUTH_TOKEN", "ghp_token"),
            ("BP_COMPOSER_INSTALL_GLOBAL", "phpunit/phpunit"),
        ]);

        let outcome = build(&ws.dirs(), &env, runner.clone(), CredentialGate::new(github.clone()))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            BuildOutcome::Contributed {
                packages: Contribution::Recontributed,
                ..
            }
        ));
        assert_eq!(github.calls.load(Ordering::SeqCst), 1);

        let order: Vec<String> = runner
            .invocations()
            .iter()
            .map(|inv| inv.args[1].clone())
            .collect();
        assert_eq!(order, vec!["-V", "check-platform-reqs", "config", "global", "install"]);

        assert_eq!(
            std::fs::read_to_string(ws.path("app/.php.ini.d/composer-extensions.ini")).unwrap(),
            "extension = gd.so\n"
        );

        let packages = Layers::new(ws.path("layers")).layer("php-composer-packages");
        let recorded: Fingerprint = packages.recorded_metadata().await.unwrap().unwrap();
        let expected =
            Fingerprint::from_file("PHP Composer", &ws.path("app/composer.lock")).unwrap();
        assert_eq!(recorded, expected);

        let rerun = Arc::new(RecordingRunner::new());
        build(&ws.dirs(), &env, rerun.clone(), CredentialGate::new(github.clone()))
            .await
            .unwrap();
        assert_eq!(rerun.calls(), 0);
        assert_eq!(github.calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn vendored_app_is_linked_into_layer() {
        let ws = Workspace::new();
        std::fs::create_dir_all(ws.path("app/lib/monolog/monolog")).unwrap();
        std::fs::write(ws.path("app/lib/autoload.php"), "<?php").unwrap();
        let env = ws.env(&[("COMPOSER_VENDOR_DIR", "lib")]);
        let runner = Arc::new(RecordingRunner::new());

        build(
            &ws.dirs(),
            &env,
            runner.clone(),
            CredentialGate::new(Arc::new(CountingGithub::default())),
        )
        .await
        .unwrap();

        let vendor = ws.path("app/lib");
        let layer_vendor = ws.path("layers/php-composer-packages/vendor");
        assert!(is_symlink(&vendor));
        assert_eq!(std::fs::read_link(&vendor).unwrap(), layer_vendor);
        assert!(layer_vendor.join("autoload.php").is_file());
        assert!(layer_vendor.join("monolog/monolog").is_dir());

        let install = runner.find("install").unwrap();
        assert_eq!(install.env["COMPOSER_VENDOR_DIR"], vendor.display().to_string());
    }

    #[tokio::test]
    async fn failed_install_is_retried_next_build() {
        let ws = Workspace::new();
        let failing = Arc::new(RecordingRunner::new().failing("install", 1, "network down"));
        let gate = CredentialGate::new(Arc::new(CountingGithub::default()));

        let err = build(&ws.dirs(), &ws.env(&[]), failing, gate.clone())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("install"));
        assert!(message.contains("network down"));

        let runner = Arc::new(RecordingRunner::new());
        build(&ws.dirs(), &ws.env(&[]), runner.clone(), gate).await.unwrap();
        assert!(runner.find("install").is_some());
    }

    #[tokio::test]
    async fn removed_token_does_not_outlive_its_build() {
        let ws = Workspace::new();
        let github = Arc::new(CountingGithub::default());
        let with_token = ws.env(&[("COMPOSER_GITHUB_OAUTH_TOKEN", "ghp_token")]);
        let runner = Arc::new(RecordingRunner::new());
        build(&ws.dirs(), &with_token, runner.clone(), CredentialGate::new(github.clone()))
            .await
            .unwrap();

        let config = runner.find("config").unwrap();
        let home = PathBuf::from(&config.env["COMPOSER_HOME"]);
        assert!(home.starts_with(ws.path("layers")));
        std::fs::write(
            home.join("auth.json"),
            r#"{"github-oauth":{"github.com":"ghp_token"}}"#,
        )
        .unwrap();

        std::fs::write(ws.path("app/composer.lock"), r#"{"packages":[]}"#).unwrap();
        let rerun = Arc::new(RecordingRunner::new());
        build(&ws.dirs(), &ws.env(&[]), rerun.clone(), CredentialGate::new(github.clone()))
            .await
            .unwrap();

        assert!(rerun.find("config").is_none());
        assert!(rerun.find("install").is_some());
        assert!(!home.join("auth.json").exists());
        assert_eq!(github.calls.load(Ordering::SeqCst), 1);
    }
}
