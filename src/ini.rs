//! PHP ini generation
//!
//! Composer runs with `PHPRC` pointing at a minimal ini in the tool layer
//! and `PHP_INI_SCAN_DIR` pointing at `<app>/.php.ini.d`, where the
//! extensions required by the project are enabled.

use crate::config::BuildEnv;
use crate::error::{ComposerError, ComposerResult};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Ini file rendered into the tool layer
pub const COMPOSER_PHP_INI: &str = "composer-php.ini";
/// Scan directory below the app root
pub const INI_SCAN_DIR: &str = ".php.ini.d";
/// Extensions file written into the scan directory
pub const EXTENSIONS_INI: &str = "composer-extensions.ini";

/// Extensions composer itself needs
pub const COMPOSER_EXTENSIONS: &[&str] = &["openssl", "zlib"];

const EXTENSION_DIR_PREFIX: &str = "no-debug-non-zts-";

/// A PHP installation provided by an earlier buildpack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpInstall {
    pub home: PathBuf,
    /// Zend module API number, e.g. `20190902`
    pub api_version: String,
}

impl PhpInstall {
    /// Locate PHP through `PHP_HOME`, falling back to `php` on `PATH`
    pub fn detect(env: &BuildEnv) -> ComposerResult<Self> {
        let home = match env.get("PHP_HOME") {
            Some(home) => PathBuf::from(home),
            None => {
                let path = env.get("PATH").unwrap_or_default();
                home_from_path(path).ok_or_else(|| {
                    ComposerError::PhpNotFound("no php executable on PATH".to_string())
                })?
            }
        };
        Self::at(home)
    }

    /// Read the extension API version of the installation at `home`
    pub fn at(home: impl Into<PathBuf>) -> ComposerResult<Self> {
        let home = home.into();
        let extensions = home.join("lib/php/extensions");

        let entries = std::fs::read_dir(&extensions).map_err(|e| {
            ComposerError::PhpNotFound(format!(
                "cannot read {}: {}",
                extensions.display(),
                e
            ))
        })?;

        let mut candidates: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter_map(|name| name.strip_prefix(EXTENSION_DIR_PREFIX).map(str::to_string))
            .collect();
        candidates.sort();

        let api_version = candidates.into_iter().next().ok_or_else(|| {
            ComposerError::PhpNotFound(format!(
                "no {}* directory in {}",
                EXTENSION_DIR_PREFIX,
                extensions.display()
            ))
        })?;

        debug!("PHP at {} (API {})", home.display(), api_version);
        Ok(Self { home, api_version })
    }

    pub fn extension_dir(&self) -> PathBuf {
        self.home
            .join("lib/php/extensions")
            .join(format!("{}{}", EXTENSION_DIR_PREFIX, self.api_version))
    }
}

/// `<dir>/..` for the first `PATH` entry containing `php`
fn home_from_path(path: &str) -> Option<PathBuf> {
    path.split(':')
        .filter(|dir| !dir.is_empty())
        .map(Path::new)
        .find(|dir| dir.join("php").is_file())
        .and_then(|bin| bin.parent().map(Path::to_path_buf))
}

/// Values rendered into `composer-php.ini`
#[derive(Debug, Clone)]
pub struct PhpIniConfig<'a> {
    pub php: &'a PhpInstall,
    pub extensions: &'a [&'a str],
}

/// Ini content for the given installation
pub fn php_ini_content(config: &PhpIniConfig<'_>) -> String {
    let mut out = String::from("[PHP]\n");
    let _ = writeln!(out, "extension_dir = \"{}\"", config.php.extension_dir().display());
    let _ = writeln!(
        out,
        "include_path = \".:{}\"",
        config.php.home.join("lib/php").display()
    );
    out.push('\n');
    for extension in config.extensions {
        let _ = writeln!(out, "extension = {}.so", extension);
    }
    out
}

/// Write `composer-php.ini` to `target`
pub async fn render_php_ini(target: &Path, config: &PhpIniConfig<'_>) -> ComposerResult<()> {
    write_file(target, &php_ini_content(config)).await
}

/// Write `extension = <name>.so` lines into `<scan_dir>/composer-extensions.ini`
///
/// The file is written even when `extensions` is empty so stale entries from
/// an earlier build disappear.
pub async fn write_extensions_ini(
    scan_dir: &Path,
    extensions: &[String],
) -> ComposerResult<PathBuf> {
    let content: String = extensions
        .iter()
        .map(|name| format!("extension = {}.so\n", name))
        .collect();

    let path = scan_dir.join(EXTENSIONS_INI);
    write_file(&path, &content).await?;
    Ok(path)
}

async fn write_file(path: &Path, content: &str) -> ComposerResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ComposerError::io(format!("creating {}", parent.display()), e))?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| ComposerError::io(format!("writing {}", path.display()), e))
}
