//! Environment visible to the buildpack
//!
//! The CNB platform passes user-provided variables as files under
//! `<platform>/env/`; those take precedence over the process environment.

use crate::error::{ComposerError, ComposerResult};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Snapshot of the variables the buildpack reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    /// Snapshot of the current process environment
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Overlay the files of `<platform>/env/`
    ///
    /// A missing env directory is not an error.
    pub async fn with_platform(mut self, platform_dir: &Path) -> ComposerResult<Self> {
        let env_dir = platform_dir.join("env");
        if !env_dir.is_dir() {
            return Ok(self);
        }

        let mut entries = fs::read_dir(&env_dir)
            .await
            .map_err(|e| ComposerError::io(format!("reading {}", env_dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ComposerError::io(format!("reading {}", env_dir.display()), e))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let value = fs::read_to_string(&path)
                .await
                .map_err(|e| ComposerError::io(format!("reading {}", path.display()), e))?;
            debug!("Platform env: {}", name);
            self.vars.insert(name.to_string(), value);
        }

        Ok(self)
    }

    /// Non-blank value of `name`, trimmed
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whitespace-separated list in `name`
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
    }
}
