//! Package installation into the `php-composer-packages` layer
//!
//! # Pipeline
//!
//! The layer is keyed on the composer.lock fingerprint. When it changes (or
//! there is no lock file) the steps below run in order and any failure
//! aborts the build:
//!
//! 1. `check-platform-reqs`, enabling missing extensions in
//!    `.php.ini.d/composer-extensions.ini`
//! 2. GitHub OAuth token configuration
//! 3. `global require` into `<layer>/global/vendor`, published on `PATH`
//! 4. relocation of a vendored `<app>/<vendor>` into `<layer>/vendor`
//! 5. `install`

pub mod relocate;

pub use relocate::Relocation;

use crate::composer::{platform, Composer, ComposerEnv, PACKAGES_LAYER};
use crate::config::InstallPlan;
use crate::credentials::{CredentialDecision, CredentialGate};
use crate::error::ComposerResult;
use crate::fingerprint::Fingerprint;
use crate::ini;
use crate::layer::{Contribution, Layer, LayerLifetime, Layers};
use crate::manifest::{self, Manifest};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Label of the packages fingerprint in layer metadata and logs
pub const FINGERPRINT_NAME: &str = "PHP Composer";

const PUBLIC_FILES_WARNING: &str = "WARNING: your composer.lock or composer.json files are located in the web directory which could publicly expose them. Please make sure this is really what you want";

/// Installs the project's packages
pub struct PackagesContributor {
    app_root: PathBuf,
    layer: Layer,
    composer: Composer,
    env: ComposerEnv,
    plan: InstallPlan,
    gate: CredentialGate,
    fingerprint: Fingerprint,
}

impl PackagesContributor {
    /// Fingerprint the project and bind the packages layer
    pub fn new(
        app_root: impl Into<PathBuf>,
        layers: &Layers,
        manifest: &Manifest,
        composer: Composer,
        env: ComposerEnv,
        plan: InstallPlan,
        gate: CredentialGate,
    ) -> ComposerResult<Self> {
        let lock_file = manifest.lock_file();
        let fingerprint = Fingerprint::for_lock_file(FINGERPRINT_NAME, lock_file.as_deref())?;

        Ok(Self {
            app_root: app_root.into(),
            layer: layers.layer(PACKAGES_LAYER),
            composer,
            env,
            plan,
            gate,
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// Install unless the layer was built for the same fingerprint
    pub async fn contribute(&self) -> ComposerResult<Contribution> {
        self.layer
            .contribute(&self.fingerprint, &[LayerLifetime::Launch], |layer| {
                self.install(layer)
            })
            .await
    }

    async fn install(&self, layer: Layer) -> ComposerResult<()> {
        self.enable_extensions().await?;
        self.configure_github_token().await?;
        self.install_global(&layer).await?;
        self.relocate_vendor(&layer).await?;

        if manifest::exposed_in_web_dir(&self.app_root, &self.plan.web_directory) {
            warn!("{}", PUBLIC_FILES_WARNING);
        }

        info!("Running composer install");
        self.composer
            .install(&self.env, &self.plan.install_options)
            .await
    }

    async fn enable_extensions(&self) -> ComposerResult<()> {
        let requirements = self.composer.check_platform_reqs(&self.env).await?;
        let missing = platform::missing_extensions(&requirements);

        if missing.is_empty() {
            debug!("All platform requirements are installed");
        } else {
            info!("Enabling PHP extensions: {}", missing.join(", "));
        }

        ini::write_extensions_ini(&self.env.ini_scan_dir, &missing).await?;
        Ok(())
    }

    async fn configure_github_token(&self) -> ComposerResult<()> {
        match self.gate.decide(self.plan.github_token.as_deref()).await? {
            CredentialDecision::Configure => {
                info!("Configuring GitHub OAuth token");
                if let Some(token) = self.plan.github_token.as_deref() {
                    self.composer
                        .config_github_token(&self.env, token.trim())
                        .await?;
                }
            }
            CredentialDecision::SkipWithWarning(message) => warn!("{}", message),
            CredentialDecision::Absent => debug!("No GitHub OAuth token configured"),
        }
        Ok(())
    }

    async fn install_global(&self, layer: &Layer) -> ComposerResult<()> {
        if self.plan.install_global.is_empty() {
            return Ok(());
        }

        let global_vendor = layer.root().join("global").join("vendor");
        info!(
            "Installing global packages: {}",
            self.plan.install_global.join(" ")
        );

        let env = self.env.with_vendor_dir(&global_vendor);
        self.composer
            .global_require(&env, &self.plan.install_global)
            .await?;

        let bin = global_vendor.join("bin");
        layer
            .prepend_launch_env("PATH", &bin.display().to_string(), ":")
            .await?;
        Ok(())
    }

    async fn relocate_vendor(&self, layer: &Layer) -> ComposerResult<()> {
        let vendor = self.app_root.join(&self.plan.vendor_directory);
        let target = layer.root().join("vendor");

        match relocate::relocate_vendor(vendor.clone(), target.clone()).await? {
            Relocation::Moved { entries } => info!(
                "Moved {} vendored entries from {} to {}",
                entries,
                vendor.display(),
                target.display()
            ),
            Relocation::AlreadyLinked => debug!("{} is already a link", vendor.display()),
            Relocation::Skipped => debug!("Nothing vendored at {}", vendor.display()),
        }
        Ok(())
    }
}

/// Contribute the download cache layer for `fingerprint`
///
/// Composer fills the directory through `COMPOSER_CACHE_DIR`; the layer only
/// has to exist with matching metadata to be restored next build.
pub async fn contribute_cache(
    layer: &Layer,
    fingerprint: &Fingerprint,
) -> ComposerResult<Contribution> {
    layer
        .contribute(fingerprint, &[LayerLifetime::Cache], |_| async { Ok(()) })
        .await
}
