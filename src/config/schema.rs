//! `buildpack.yml` schema
//!
//! Only the `composer` and `php.webdirectory` keys are read; other buildpacks
//! own the rest of the file.

use serde::{Deserialize, Serialize};

/// Default web root used by the PHP buildpacks
pub const DEFAULT_WEB_DIRECTORY: &str = "htdocs";
/// Default `COMPOSER_VENDOR_DIR`, relative to the app
pub const DEFAULT_VENDOR_DIRECTORY: &str = "vendor";

/// Root of `buildpack.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackYaml {
    pub composer: ComposerSection,
    pub php: PhpSection,
}

/// A YAML value given either as one string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Whitespace-split a single string, keep lists as they are
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => value.split_whitespace().map(str::to_string).collect(),
            Self::Many(values) => values,
        }
    }
}

/// `composer:` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSection {
    /// Requested composer version, forwarded to the build plan
    pub version: Option<String>,

    /// Extra flags for `composer install`
    pub install_options: Option<StringOrList>,

    /// Vendor directory relative to the app
    pub vendor_directory: Option<String>,

    /// Directory of composer.json below the web directory
    pub json_path: Option<String>,

    /// Packages for `composer global require`
    pub install_global: Option<StringOrList>,
}

impl ComposerSection {
    /// Keys that have an environment variable replacement, as `(key, variable)`
    pub fn deprecated_keys(&self) -> Vec<(&'static str, &'static str)> {
        let mut keys = Vec::new();
        if self.install_options.is_some() {
            keys.push(("composer.install_options", "BP_COMPOSER_INSTALL_OPTIONS"));
        }
        if self.vendor_directory.is_some() {
            keys.push(("composer.vendor_directory", "COMPOSER_VENDOR_DIR"));
        }
        if self.json_path.is_some() {
            keys.push(("composer.json_path", "COMPOSER"));
        }
        if self.install_global.is_some() {
            keys.push(("composer.install_global", "BP_COMPOSER_INSTALL_GLOBAL"));
        }
        keys
    }
}

/// `php:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpSection {
    /// Public document root
    pub webdirectory: String,
}

impl Default for PhpSection {
    fn default() -> Self {
        Self {
            webdirectory: DEFAULT_WEB_DIRECTORY.to_string(),
        }
    }
}
