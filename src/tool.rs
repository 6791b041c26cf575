//! The `composer` tool layer
//!
//! Holds `composer.phar` and the ini composer runs with. Available to later
//! build steps and cached between builds. The ini points into the PHP
//! installation, so the layer is keyed on the phar's content hash together
//! with the PHP home and extension API.

use crate::composer::{Composer, ComposerEnv, COMPOSER_PHAR, TOOL_LAYER};
use crate::config::BuildEnv;
use crate::error::{ComposerError, ComposerResult};
use crate::fingerprint::Fingerprint;
use crate::ini::{self, PhpIniConfig, PhpInstall, COMPOSER_EXTENSIONS, COMPOSER_PHP_INI};
use crate::layer::{Contribution, Layer, LayerLifetime, Layers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const FINGERPRINT_NAME: &str = "Composer";

/// Location of composer.phar inside the buildpack
///
/// `BP_COMPOSER_PHAR` wins over `$CNB_BUILDPACK_DIR/dependencies/composer.phar`.
pub fn locate_phar(env: &BuildEnv) -> ComposerResult<PathBuf> {
    let path = match (env.get("BP_COMPOSER_PHAR"), env.get("CNB_BUILDPACK_DIR")) {
        (Some(phar), _) => PathBuf::from(phar),
        (None, Some(dir)) => Path::new(dir).join("dependencies").join(COMPOSER_PHAR),
        (None, None) => {
            let exe = std::env::current_exe()
                .map_err(|e| ComposerError::io("locating the buildpack executable", e))?;
            // bin/<exe> -> <buildpack>/dependencies
            exe.parent()
                .and_then(Path::parent)
                .map(|dir| dir.join("dependencies").join(COMPOSER_PHAR))
                .unwrap_or_else(|| PathBuf::from(COMPOSER_PHAR))
        }
    };

    if path.is_file() {
        Ok(path)
    } else {
        Err(ComposerError::PharNotFound(path))
    }
}

/// Identity of the tool layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub php_home: PathBuf,
    pub php_api: String,
    pub phar: Fingerprint,
}

impl ToolMetadata {
    pub fn new(phar: Fingerprint, php: &PhpInstall) -> Self {
        Self {
            php_home: php.home.clone(),
            php_api: php.api_version.clone(),
            phar,
        }
    }
}

impl fmt::Display for ToolMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PHP API {})", self.phar, self.php_api)
    }
}

/// Contributes composer itself
pub struct ToolContributor {
    layer: Layer,
    phar_source: PathBuf,
    php: PhpInstall,
    metadata: ToolMetadata,
}

impl ToolContributor {
    pub fn new(layers: &Layers, phar_source: PathBuf, php: PhpInstall) -> ComposerResult<Self> {
        let phar = Fingerprint::from_file(FINGERPRINT_NAME, &phar_source)?;
        Ok(Self {
            layer: layers.layer(TOOL_LAYER),
            metadata: ToolMetadata::new(phar, &php),
            phar_source,
            php,
        })
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// Phar path once contributed
    pub fn phar(&self) -> PathBuf {
        self.layer.root().join(COMPOSER_PHAR)
    }

    /// `PHPRC` for composer
    pub fn php_ini(&self) -> PathBuf {
        self.layer.root().join(COMPOSER_PHP_INI)
    }

    /// Copy the phar, render its ini and print the composer version
    pub async fn contribute(
        &self,
        composer: &Composer,
        env: &ComposerEnv,
    ) -> ComposerResult<Contribution> {
        self.layer
            .contribute(
                &self.metadata,
                &[LayerLifetime::Build, LayerLifetime::Cache],
                |layer| async move {
                    let phar = layer.root().join(COMPOSER_PHAR);
                    debug!("Copying {} to {}", self.phar_source.display(), phar.display());
                    fs::copy(&self.phar_source, &phar).await.map_err(|e| {
                        ComposerError::io(
                            format!("copying {} to {}", self.phar_source.display(), phar.display()),
                            e,
                        )
                    })?;

                    ini::render_php_ini(
                        &layer.root().join(COMPOSER_PHP_INI),
                        &PhpIniConfig {
                            php: &self.php,
                            extensions: COMPOSER_EXTENSIONS,
                        },
                    )
                    .await?;

                    composer.version(env).await
                },
            )
            .await
    }
}
