//! Composer invocations
//!
//! Every call runs `php <composer.phar> <subcommand>` from the directory that
//! holds `composer.json`, with an explicit [`ComposerEnv`] instead of changes
//! to the buildpack's own environment.

pub mod platform;

pub use platform::{PlatformRequirement, RequirementStatus};

use crate::error::ComposerResult;
use crate::runner::{Invocation, ToolRunner};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Build plan dependency provided by this buildpack
pub const DEPENDENCY: &str = "php-composer";
/// Layer holding composer.phar and its ini
pub const TOOL_LAYER: &str = "composer";
/// Layer holding the composer download cache
pub const CACHE_LAYER: &str = "php-composer-cache";
/// Layer holding installed packages
pub const PACKAGES_LAYER: &str = "php-composer-packages";
/// Scratch layer used as `COMPOSER_HOME`, emptied every build
pub const HOME_LAYER: &str = "php-composer-home";

pub const COMPOSER_JSON: &str = "composer.json";
pub const COMPOSER_LOCK: &str = "composer.lock";
pub const COMPOSER_PHAR: &str = "composer.phar";

/// Environment handed to every composer process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerEnv {
    /// `COMPOSER_HOME`, where global config and packages live
    pub home: PathBuf,
    /// `COMPOSER_CACHE_DIR`
    pub cache_dir: PathBuf,
    /// `COMPOSER_VENDOR_DIR`
    pub vendor_dir: PathBuf,
    /// `PHPRC`, the ini rendered into the tool layer
    pub php_ini: PathBuf,
    /// `PHP_INI_SCAN_DIR`, where the extensions ini is written
    pub ini_scan_dir: PathBuf,
    /// `PATH`, left to the inherited value when `None`
    pub path: Option<String>,
}

impl ComposerEnv {
    /// Copy with a different vendor directory
    pub fn with_vendor_dir(&self, vendor_dir: impl Into<PathBuf>) -> Self {
        Self {
            vendor_dir: vendor_dir.into(),
            ..self.clone()
        }
    }

    /// Variables set on the child process
    pub fn vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("COMPOSER_HOME".to_string(), self.home.display().to_string());
        vars.insert(
            "COMPOSER_CACHE_DIR".to_string(),
            self.cache_dir.display().to_string(),
        );
        vars.insert(
            "COMPOSER_VENDOR_DIR".to_string(),
            self.vendor_dir.display().to_string(),
        );
        vars.insert("PHPRC".to_string(), self.php_ini.display().to_string());
        vars.insert(
            "PHP_INI_SCAN_DIR".to_string(),
            self.ini_scan_dir.display().to_string(),
        );
        vars.insert("COMPOSER_NO_INTERACTION".to_string(), "1".to_string());
        if let Some(path) = &self.path {
            vars.insert("PATH".to_string(), path.clone());
        }
        vars
    }
}

/// `php composer.phar` bound to a project directory
#[derive(Clone)]
pub struct Composer {
    runner: Arc<dyn ToolRunner>,
    working_dir: PathBuf,
    phar: PathBuf,
}

impl Composer {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        working_dir: impl Into<PathBuf>,
        phar: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            working_dir: working_dir.into(),
            phar: phar.into(),
        }
    }

    pub(crate) fn runner(&self) -> &dyn ToolRunner {
        self.runner.as_ref()
    }

    /// `php <phar>` with the given environment, arguments still to add
    pub(crate) fn invocation(&self, env: &ComposerEnv) -> Invocation {
        Invocation::new("php", &self.working_dir)
            .arg(self.phar.display().to_string())
            .envs(env.vars())
    }

    /// Log the composer version
    pub async fn version(&self, env: &ComposerEnv) -> ComposerResult<()> {
        let invocation = self.invocation(env).arg("-V");
        let output = self.runner.run_capturing(&invocation).await?;
        output.ensure_status(&invocation, &[0])?;
        info!("{}", output.stdout.trim());
        Ok(())
    }

    /// `install --no-progress <flags>`
    pub async fn install(&self, env: &ComposerEnv, flags: &[String]) -> ComposerResult<()> {
        let invocation = self
            .invocation(env)
            .args(["install", "--no-progress"])
            .args(flags.iter().cloned());
        self.runner.run(&invocation).await
    }

    /// `global require --no-progress <packages>`
    pub async fn global_require(
        &self,
        env: &ComposerEnv,
        packages: &[String],
    ) -> ComposerResult<()> {
        let invocation = self
            .invocation(env)
            .args(["global", "require", "--no-progress"])
            .args(packages.iter().cloned());
        self.runner.run(&invocation).await
    }

    /// Store the GitHub OAuth token in the global composer config
    pub async fn config_github_token(&self, env: &ComposerEnv, token: &str) -> ComposerResult<()> {
        let invocation = self
            .invocation(env)
            .args(["config", "-g", "github-oauth.github.com"])
            .secret_arg(token);
        self.runner.run(&invocation).await
    }
}
