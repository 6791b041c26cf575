//! composer.json discovery

use crate::composer::{COMPOSER_JSON, COMPOSER_LOCK};
use crate::config::InstallPlan;
use crate::error::{ComposerError, ComposerResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A located composer.json and its directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub composer_json: PathBuf,
}

impl Manifest {
    /// Directory composer runs from
    pub fn dir(&self) -> &Path {
        self.composer_json.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Path where composer.lock would be
    pub fn lock_path(&self) -> PathBuf {
        self.dir().join(COMPOSER_LOCK)
    }

    /// composer.lock when the project has one
    pub fn lock_file(&self) -> Option<PathBuf> {
        let lock = self.lock_path();
        lock.is_file().then_some(lock)
    }

    /// PHP constraint for the build plan
    ///
    /// `platform.php` from composer.lock wins; otherwise `require.php` from
    /// composer.json. Empty when neither declares one.
    pub fn php_version(&self) -> ComposerResult<String> {
        if let Some(version) = lock_php_version(&self.lock_path()).filter(|v| !v.is_empty()) {
            return Ok(version);
        }

        let content = std::fs::read_to_string(&self.composer_json).map_err(|e| {
            ComposerError::io(format!("reading {}", self.composer_json.display()), e)
        })?;
        let json: ComposerJson = serde_json::from_str(&content).map_err(|e| {
            ComposerError::ConfigInvalid {
                path: self.composer_json.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(json.require.php)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposerJson {
    require: PhpConstraint,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposerLock {
    platform: PhpConstraint,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhpConstraint {
    php: String,
}

fn lock_php_version(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<ComposerLock>(&content) {
        Ok(lock) => Some(lock.platform.php),
        Err(e) => {
            debug!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

/// Locate composer.json for the app
///
/// Checked in order: the `COMPOSER` override (relative to the app), the app
/// root, then `<web_dir>/<json_path>/composer.json`.
pub fn find_composer_json(
    app_root: &Path,
    web_dir: &str,
    json_path: &str,
    composer_override: Option<&str>,
) -> ComposerResult<Manifest> {
    let mut candidates = Vec::new();
    if let Some(path) = composer_override {
        candidates.push(app_root.join(path));
    }
    candidates.push(app_root.join(COMPOSER_JSON));
    candidates.push(app_root.join(web_dir).join(json_path).join(COMPOSER_JSON));

    for candidate in &candidates {
        if candidate.is_file() {
            debug!("Using {}", candidate.display());
            return Ok(Manifest {
                composer_json: candidate.clone(),
            });
        }
        debug!("No composer.json at {}", candidate.display());
    }

    Err(ComposerError::ManifestNotFound {
        searched: candidates
            .last()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    })
}

/// Locate composer.json with the locations from an install plan
pub fn find_for_plan(app_root: &Path, plan: &InstallPlan) -> ComposerResult<Manifest> {
    find_composer_json(
        app_root,
        &plan.web_directory,
        &plan.json_path,
        plan.composer_path.as_deref(),
    )
}

/// Whether composer.json or composer.lock sit in the public web directory
pub fn exposed_in_web_dir(app_root: &Path, web_dir: &str) -> bool {
    let web_root = app_root.join(web_dir);
    web_root.join(COMPOSER_JSON).exists() || web_root.join(COMPOSER_LOCK).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn finds_in_app_root() {
        let temp = TempDir::new().unwrap();
        let json = write(temp.path(), "composer.json", "{}");

        let manifest = find_composer_json(temp.path(), "htdocs", "", None).unwrap();
        assert_eq!(manifest.composer_json, json);
        assert_eq!(manifest.dir(), temp.path());
    }

    #[test]
    fn finds_in_web_dir_with_json_path() {
        let temp = TempDir::new().unwrap();
        let json = write(temp.path(), "public/subdir/composer.json", "{}");

        let manifest = find_composer_json(temp.path(), "public", "subdir", None).unwrap();
        assert_eq!(manifest.composer_json, json);
    }

    #[test]
    fn override_wins() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "composer.json", "{}");
        let custom = write(temp.path(), "app/composer.json", "{}");

        let manifest =
            find_composer_json(temp.path(), "htdocs", "", Some("app/composer.json")).unwrap();
        assert_eq!(manifest.composer_json, custom);
    }

    #[test]
    fn not_found_names_last_location() {
        let temp = TempDir::new().unwrap();
        let err = find_composer_json(temp.path(), "htdocs", "", None).unwrap_err();

        let expected = format!(
            "no \"composer.json\" found at: {}",
            temp.path().join("htdocs").join("composer.json").display()
        );
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn lock_file_only_when_present() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "composer.json", "{}");
        let manifest = find_composer_json(temp.path(), "htdocs", "", None).unwrap();
        assert!(manifest.lock_file().is_none());

        let lock = write(temp.path(), "composer.lock", "{}");
        assert_eq!(manifest.lock_file(), Some(lock));
    }

    #[test]
    fn php_version_prefers_lock_platform() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "composer.json", r#"{"require":{"php":">=7.2"}}"#);
        write(temp.path(), "composer.lock", r#"{"platform":{"php":"~7.3.0"}}"#);

        let manifest = find_composer_json(temp.path(), "htdocs", "", None).unwrap();
        assert_eq!(manifest.php_version().unwrap(), "~7.3.0");
    }

    #[test]
    fn php_version_falls_back_to_require() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "composer.json", r#"{"require":{"php":">=7.2"}}"#);
        write(temp.path(), "composer.lock", r#"{"platform":[]}"#);

        let manifest = find_composer_json(temp.path(), "htdocs", "", None).unwrap();
        assert_eq!(manifest.php_version().unwrap(), ">=7.2");
    }

    #[test]
    fn php_version_empty_when_unconstrained() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "composer.json", r#"{"name":"acme/app"}"#);

        let manifest = find_composer_json(temp.path(), "htdocs", "", None).unwrap();
        assert_eq!(manifest.php_version().unwrap(), "");
    }

    #[test]
    fn exposure_in_web_dir() {
        let temp = TempDir::new().unwrap();
        assert!(!exposed_in_web_dir(temp.path(), "htdocs"));

        write(temp.path(), "htdocs/composer.lock", "{}");
        assert!(exposed_in_web_dir(temp.path(), "htdocs"));
    }
}
