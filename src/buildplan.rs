//! CNB build plans
//!
//! `detect` writes what the buildpack provides and requires; `build` reads
//! the entries the lifecycle resolved for it.

use crate::error::{ComposerError, ComposerResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Dependency name of the PHP interpreter
pub const PHP_DEPENDENCY: &str = "php";

/// Plan written by `detect`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectPlan {
    #[serde(default)]
    pub provides: Vec<Provide>,
    #[serde(default)]
    pub requires: Vec<Require>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provide {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Require {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default)]
    pub metadata: RequireMetadata,
}

/// Phases a required dependency must be available in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequireMetadata {
    #[serde(default)]
    pub build: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub launch: bool,
}

impl DetectPlan {
    /// Plan for an app with a composer.json
    ///
    /// Composer is needed at build time; PHP at build and launch time.
    pub fn for_composer(composer_version: &str, php_version: &str) -> Self {
        Self {
            provides: vec![Provide {
                name: crate::composer::DEPENDENCY.to_string(),
            }],
            requires: vec![
                Require {
                    name: crate::composer::DEPENDENCY.to_string(),
                    version: composer_version.to_string(),
                    metadata: RequireMetadata {
                        build: true,
                        launch: false,
                    },
                },
                Require {
                    name: PHP_DEPENDENCY.to_string(),
                    version: php_version.to_string(),
                    metadata: RequireMetadata {
                        build: true,
                        launch: true,
                    },
                },
            ],
        }
    }

    pub async fn write(&self, path: &Path) -> ComposerResult<()> {
        let content = toml::to_string(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| ComposerError::io(format!("writing build plan {}", path.display()), e))
    }
}

/// Plan handed to `build`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildpackPlan {
    #[serde(default)]
    pub entries: Vec<PlanEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub metadata: toml::Table,
}

impl BuildpackPlan {
    /// Read the plan; a missing file is an empty plan
    pub async fn read(path: &Path) -> ComposerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ComposerError::io(format!("reading build plan {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ComposerError::BuildPlanInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn entry(&self, name: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
