//! Build command - contribute the composer, packages and cache layers

use crate::buildplan::BuildpackPlan;
use crate::cli::BuildArgs;
use crate::composer::{Composer, ComposerEnv, CACHE_LAYER, DEPENDENCY, HOME_LAYER};
use crate::config::{BuildEnv, InstallPlan};
use crate::credentials::{CredentialGate, GithubApi};
use crate::error::ComposerResult;
use crate::ini::{PhpInstall, INI_SCAN_DIR};
use crate::layer::{Contribution, Layers};
use crate::manifest;
use crate::packages::{self, PackagesContributor};
use crate::runner::{ProcessRunner, ToolRunner};
use crate::tool::{self, ToolContributor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Directories handed to `bin/build`
#[derive(Debug, Clone)]
pub struct BuildDirs {
    pub app: PathBuf,
    pub layers: PathBuf,
    pub plan: PathBuf,
}

/// Result of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The buildpack plan does not ask for composer
    NotRequested,
    Contributed {
        tool: Contribution,
        packages: Contribution,
        cache: Contribution,
    },
}

/// Execute the build command
pub async fn execute(args: BuildArgs, app_dir: &Path) -> ComposerResult<()> {
    let env = BuildEnv::from_process()
        .with_platform(&args.platform_dir)
        .await?;
    let dirs = BuildDirs {
        app: app_dir.to_path_buf(),
        layers: args.layers_dir,
        plan: args.plan_path,
    };
    let gate = CredentialGate::new(Arc::new(GithubApi::new()));

    build(&dirs, &env, Arc::new(ProcessRunner::new()), gate).await?;
    Ok(())
}

/// Build with explicit collaborators
pub async fn build(
    dirs: &BuildDirs,
    env: &BuildEnv,
    runner: Arc<dyn ToolRunner>,
    gate: CredentialGate,
) -> ComposerResult<BuildOutcome> {
    info!("PHP Composer Buildpack {}", env!("CARGO_PKG_VERSION"));

    let buildpack_plan = BuildpackPlan::read(&dirs.plan).await?;
    if buildpack_plan.entry(DEPENDENCY).is_none() {
        info!("{} was not requested, skipping", DEPENDENCY);
        return Ok(BuildOutcome::NotRequested);
    }

    let plan = InstallPlan::load(&dirs.app, env).await?;
    let manifest = manifest::find_for_plan(&dirs.app, &plan)?;
    let php = PhpInstall::detect(env)?;
    let phar_source = tool::locate_phar(env)?;

    let layers = Layers::new(&dirs.layers);
    let tool = ToolContributor::new(&layers, phar_source, php)?;
    let cache_layer = layers.layer(CACHE_LAYER);

    // COMPOSER_HOME holds the OAuth token and global config; empty every build
    let home_layer = layers.layer(HOME_LAYER);
    home_layer.reset().await?;

    let composer_env = ComposerEnv {
        home: home_layer.root().to_path_buf(),
        cache_dir: cache_layer.root().join("cache"),
        vendor_dir: dirs.app.join(&plan.vendor_directory),
        php_ini: tool.php_ini(),
        ini_scan_dir: dirs.app.join(INI_SCAN_DIR),
        path: env.get("PATH").map(str::to_string),
    };
    let composer = Composer::new(runner, manifest.dir(), tool.phar());

    let tool_outcome = tool.contribute(&composer, &composer_env).await?;

    let contributor = PackagesContributor::new(
        &dirs.app,
        &layers,
        &manifest,
        composer,
        composer_env,
        plan,
        gate,
    )?;
    let packages_outcome = contributor.contribute().await?;
    let cache_outcome = packages::contribute_cache(&cache_layer, contributor.fingerprint()).await?;

    Ok(BuildOutcome::Contributed {
        tool: tool_outcome,
        packages: packages_outcome,
        cache: cache_outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::RateLimitClient;
    use crate::runner::RecordingRunner;
    use async_trait::async_trait;
    use serde_json::Value;
    use tempfile::TempDir;

    struct Unreachable;

    #[async_trait]
    impl RateLimitClient for Unreachable {
        async fn rate_limit(&self, _token: &str) -> ComposerResult<Value> {
            panic!("no token configured, GitHub must not be queried");
        }
    }

    fn gate() -> CredentialGate {
        CredentialGate::new(Arc::new(Unreachable))
    }

    struct Fixture {
        _temp: TempDir,
        dirs: BuildDirs,
        env: BuildEnv,
    }

    fn fixture(plan: &str) -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let app = root.join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("composer.json"), "{}").unwrap();
        std::fs::write(app.join("composer.lock"), r#"{"packages":[]}"#).unwrap();

        std::fs::create_dir_all(root.join("buildpack/dependencies")).unwrap();
        std::fs::write(root.join("buildpack/dependencies/composer.phar"), "phar").unwrap();
        std::fs::create_dir_all(root.join("php/lib/php/extensions/no-debug-non-zts-20190902"))
            .unwrap();
        std::fs::create_dir_all(root.join("layers")).unwrap();
        std::fs::write(root.join("plan.toml"), plan).unwrap();

        let env = BuildEnv::from_vars([
            ("CNB_BUILDPACK_DIR", root.join("buildpack").display().to_string()),
            ("PHP_HOME", root.join("php").display().to_string()),
            ("PATH", "/usr/bin:/bin".to_string()),
        ]);
        let dirs = BuildDirs {
            app,
            layers: root.join("layers"),
            plan: root.join("plan.toml"),
        };
        Fixture {
            _temp: temp,
            dirs,
            env,
        }
    }

    const REQUESTED: &str =
        "[[entries]]\nname = \"php-composer\"\n[entries.metadata]\nbuild = true\n";

    #[tokio::test]
    async fn not_requested_does_nothing() {
        let fixture = fixture("[[entries]]\nname = \"php\"\n");
        let runner = Arc::new(RecordingRunner::new());

        let outcome = build(&fixture.dirs, &fixture.env, runner.clone(), gate()).await.unwrap();

        assert_eq!(outcome, BuildOutcome::NotRequested);
        assert_eq!(runner.calls(), 0);
        assert_eq!(std::fs::read_dir(&fixture.dirs.layers).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn contributes_all_layers_then_reuses() {
        let fixture = fixture(REQUESTED);
        let runner = Arc::new(RecordingRunner::new());

        let outcome = build(&fixture.dirs, &fixture.env, runner.clone(), gate()).await.unwrap();
        assert_eq!(
            outcome,
            BuildOutcome::Contributed {
                tool: Contribution::Recontributed,
                packages: Contribution::Recontributed,
                cache: Contribution::Recontributed,
            }
        );

        let layers = &fixture.dirs.layers;
        assert!(layers.join("composer/composer.phar").is_file());
        assert!(layers.join("composer.toml").is_file());
        assert!(layers.join("php-composer-packages.toml").is_file());
        assert!(layers.join("php-composer-cache.toml").is_file());

        let install = runner.find("install").unwrap();
        assert_eq!(
            install.env["COMPOSER_CACHE_DIR"],
            layers.join("php-composer-cache/cache").display().to_string()
        );
        assert_eq!(install.env["PATH"], "/usr/bin:/bin");
        assert_eq!(
            install.args[0],
            layers.join("composer/composer.phar").display().to_string()
        );

        let rerun = Arc::new(RecordingRunner::new());
        let outcome = build(&fixture.dirs, &fixture.env, rerun.clone(), gate()).await.unwrap();
        assert_eq!(
            outcome,
            BuildOutcome::Contributed {
                tool: Contribution::Reused,
                packages: Contribution::Reused,
                cache: Contribution::Reused,
            }
        );
        assert_eq!(rerun.calls(), 0);
    }

    #[tokio::test]
    async fn missing_php_fails_before_any_layer() {
        let mut fixture = fixture(REQUESTED);
        fixture.env = BuildEnv::from_vars([("PATH", "/nonexistent")]);
        let runner = Arc::new(RecordingRunner::new());

        let err = build(&fixture.dirs, &fixture.env, runner.clone(), gate()).await.unwrap_err();
        assert!(matches!(err, crate::error::ComposerError::PhpNotFound(_)));
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn composer_home_starts_empty_every_build() {
        let fixture = fixture(REQUESTED);
        let home = fixture.dirs.layers.join("php-composer-home");
        let runner = Arc::new(RecordingRunner::new());
        build(&fixture.dirs, &fixture.env, runner.clone(), gate()).await.unwrap();

        let install = runner.find("install").unwrap();
        assert_eq!(install.env["COMPOSER_HOME"], home.display().to_string());
        std::fs::write(home.join("auth.json"), r#"{"github-oauth":{}}"#).unwrap();

        build(&fixture.dirs, &fixture.env, Arc::new(RecordingRunner::new()), gate())
            .await
            .unwrap();

        assert!(home.is_dir());
        assert!(!home.join("auth.json").exists());
        assert!(!fixture.dirs.layers.join("php-composer-home.toml").exists());
        assert!(!fixture.dirs.layers.join("composer/.composer").exists());
    }
}
