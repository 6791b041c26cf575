//! `<layer>.toml` content metadata
//!
//! The lifetime flags tell the CNB lifecycle what to do with a layer after
//! the build; the `[metadata]` table is ours and holds the layer identity.

use crate::error::ComposerResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// How long a layer lives beyond the current build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerLifetime {
    /// Visible to subsequent buildpacks during this build only
    Build,
    /// Restored on the next build, never exported
    Cache,
    /// Exported to the application image
    Launch,
}

/// Parsed or to-be-written `<layer>.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerContentMetadata<M = toml::Value> {
    #[serde(default)]
    pub launch: bool,
    #[serde(default)]
    pub build: bool,
    #[serde(default)]
    pub cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<M>,
}

impl<'a, M: Serialize> LayerContentMetadata<&'a M> {
    /// Metadata with flags set from `lifetimes`
    pub fn new(lifetimes: &[LayerLifetime], metadata: &'a M) -> Self {
        Self {
            launch: lifetimes.contains(&LayerLifetime::Launch),
            build: lifetimes.contains(&LayerLifetime::Build),
            cache: lifetimes.contains(&LayerLifetime::Cache),
            metadata: Some(metadata),
        }
    }

    pub fn render(&self) -> ComposerResult<String> {
        Ok(toml::to_string(self)?)
    }
}

/// Metadata file with an untyped `[metadata]` table
pub type RawLayerMetadata = LayerContentMetadata<toml::Value>;

impl RawLayerMetadata {
    /// Parse a metadata file, keeping `[metadata]` untyped
    pub fn parse(content: &str) -> ComposerResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The `[metadata]` table as `M`, if present and well-formed
    pub fn metadata_as<M: DeserializeOwned>(&self) -> Option<M> {
        self.metadata.clone().and_then(|value| value.try_into().ok())
    }
}
