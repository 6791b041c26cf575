//! Detect command - pass when the app has a composer.json

use crate::buildplan::DetectPlan;
use crate::cli::DetectArgs;
use crate::config::{BuildEnv, InstallPlan};
use crate::error::{ComposerError, ComposerResult};
use crate::manifest;
use std::path::Path;
use tracing::{info, warn};

/// Result of detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectOutcome {
    Pass,
    Fail,
}

impl DetectOutcome {
    /// CNB exit code
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail => 100,
        }
    }
}

/// Execute the detect command
pub async fn execute(args: DetectArgs, app_dir: &Path) -> ComposerResult<DetectOutcome> {
    let env = BuildEnv::from_process()
        .with_platform(&args.platform_dir)
        .await?;
    detect(app_dir, &args.plan_path, &env).await
}

/// Detect with an explicit environment
///
/// Any problem reading the app fails detection; only writing the plan is
/// an error.
pub async fn detect(
    app_dir: &Path,
    plan_path: &Path,
    env: &BuildEnv,
) -> ComposerResult<DetectOutcome> {
    let (composer_version, php_version) = match inspect(app_dir, env).await {
        Ok(versions) => versions,
        Err(e @ ComposerError::ManifestNotFound { .. }) => {
            info!("{}", e);
            return Ok(DetectOutcome::Fail);
        }
        Err(e) => {
            warn!("{}", e);
            return Ok(DetectOutcome::Fail);
        }
    };

    DetectPlan::for_composer(&composer_version, &php_version)
        .write(plan_path)
        .await?;
    Ok(DetectOutcome::Pass)
}

/// Requested composer version and the app's PHP constraint
async fn inspect(app_dir: &Path, env: &BuildEnv) -> ComposerResult<(String, String)> {
    let plan = InstallPlan::load(app_dir, env).await?;
    let manifest = manifest::find_for_plan(app_dir, &plan)?;

    let php_version = manifest.php_version()?;
    info!(
        "Found {} (php {})",
        manifest.composer_json.display(),
        if php_version.is_empty() { "*" } else { php_version.as_str() }
    );
    Ok((plan.version, php_version))
}
