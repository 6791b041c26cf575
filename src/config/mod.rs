//! Install configuration
//!
//! Settings come from `buildpack.yml` in the app root, overridden by
//! environment variables:
//!
//! | Variable | buildpack.yml key |
//! |----------|-------------------|
//! | `BP_COMPOSER_INSTALL_OPTIONS` | `composer.install_options` |
//! | `COMPOSER_VENDOR_DIR` | `composer.vendor_directory` |
//! | `COMPOSER` | `composer.json_path` |
//! | `BP_COMPOSER_INSTALL_GLOBAL` | `composer.install_global` |
//! | `COMPOSER_GITHUB_OAUTH_TOKEN` | |

pub mod env;
pub mod schema;

pub use env::BuildEnv;
pub use schema::BuildpackYaml;

use crate::credentials::TOKEN_VAR;
use crate::error::{ComposerError, ComposerResult};
use schema::{DEFAULT_VENDOR_DIRECTORY, DEFAULT_WEB_DIRECTORY};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

pub const BUILDPACK_YML: &str = "buildpack.yml";

const INSTALL_OPTIONS_VAR: &str = "BP_COMPOSER_INSTALL_OPTIONS";
const VENDOR_DIR_VAR: &str = "COMPOSER_VENDOR_DIR";
const COMPOSER_PATH_VAR: &str = "COMPOSER";
const INSTALL_GLOBAL_VAR: &str = "BP_COMPOSER_INSTALL_GLOBAL";

/// Resolved settings for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// Requested composer version, empty for any
    pub version: String,
    /// Flags after `install --no-progress`
    pub install_options: Vec<String>,
    /// Packages for `global require`, nothing runs when empty
    pub install_global: Vec<String>,
    /// Vendor directory relative to the app root
    pub vendor_directory: String,
    /// Path of composer.json relative to the app, from `COMPOSER`
    pub composer_path: Option<String>,
    /// composer.json directory below the web directory
    pub json_path: String,
    pub web_directory: String,
    pub github_token: Option<String>,
}

impl Default for InstallPlan {
    fn default() -> Self {
        Self {
            version: String::new(),
            install_options: vec!["--no-dev".to_string()],
            install_global: Vec::new(),
            vendor_directory: DEFAULT_VENDOR_DIRECTORY.to_string(),
            composer_path: None,
            json_path: String::new(),
            web_directory: DEFAULT_WEB_DIRECTORY.to_string(),
            github_token: None,
        }
    }
}

impl InstallPlan {
    /// Load `buildpack.yml` and apply environment overrides
    pub async fn load(app_root: &Path, env: &BuildEnv) -> ComposerResult<Self> {
        let yaml = load_buildpack_yaml(app_root).await?;
        Ok(Self::resolve(yaml, env))
    }

    /// Merge a parsed `buildpack.yml` with the environment
    pub fn resolve(yaml: BuildpackYaml, env: &BuildEnv) -> Self {
        let deprecated = yaml.composer.deprecated_keys();
        if !deprecated.is_empty() {
            let mapping = deprecated
                .iter()
                .map(|(key, var)| format!("  {} -> {}", key, var))
                .collect::<Vec<_>>()
                .join("\n");
            warn!(
                "Setting composer options through {} is deprecated, use environment variables instead:\n{}",
                BUILDPACK_YML, mapping
            );
        }

        let defaults = Self::default();
        let composer = yaml.composer;

        let install_options = env
            .list(INSTALL_OPTIONS_VAR)
            .or_else(|| composer.install_options.map(|o| o.into_vec()))
            .unwrap_or(defaults.install_options);

        let install_global = env
            .list(INSTALL_GLOBAL_VAR)
            .or_else(|| composer.install_global.map(|g| g.into_vec()))
            .unwrap_or_default();

        let vendor_directory = env
            .get(VENDOR_DIR_VAR)
            .map(str::to_string)
            .or(composer.vendor_directory.filter(|v| !v.trim().is_empty()))
            .unwrap_or(defaults.vendor_directory);

        let web_directory = if yaml.php.webdirectory.trim().is_empty() {
            defaults.web_directory
        } else {
            yaml.php.webdirectory
        };

        let plan = Self {
            version: composer.version.unwrap_or_default(),
            install_options,
            install_global,
            vendor_directory,
            composer_path: env.get(COMPOSER_PATH_VAR).map(str::to_string),
            json_path: composer.json_path.unwrap_or_default(),
            web_directory,
            github_token: env.get(TOKEN_VAR).map(str::to_string),
        };
        debug!(
            "Install options: {:?}, global packages: {:?}, vendor directory: {}",
            plan.install_options, plan.install_global, plan.vendor_directory
        );
        plan
    }
}

/// Parse `<app>/buildpack.yml`, defaults when absent
pub async fn load_buildpack_yaml(app_root: &Path) -> ComposerResult<BuildpackYaml> {
    let path = app_root.join(BUILDPACK_YML);
    if !path.exists() {
        debug!("No {} found, using defaults", BUILDPACK_YML);
        return Ok(BuildpackYaml::default());
    }

    let content = fs::read_to_string(&path)
        .await
        .map_err(|e| ComposerError::io(format!("reading config from {}", path.display()), e))?;

    if content.trim().is_empty() {
        return Ok(BuildpackYaml::default());
    }

    serde_yaml::from_str(&content).map_err(|e| ComposerError::ConfigInvalid {
        path,
        reason: e.to_string(),
    })
}
