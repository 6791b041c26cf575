//! CNB layer environment files
//!
//! The lifecycle applies `<layer>/env.launch/<NAME>.<op>` files to the
//! launched process. Prepends are joined to the existing value with the
//! separator in `<NAME>.delim`.

use super::Layer;
use crate::error::{ComposerError, ComposerResult};
use std::path::PathBuf;
use tokio::fs;

const LAUNCH_ENV_DIR: &str = "env.launch";

impl Layer {
    /// Prepend `value` to `name` at launch, separated by `delim`
    ///
    /// Returns the path of the `.prepend` file.
    pub async fn prepend_launch_env(
        &self,
        name: &str,
        value: &str,
        delim: &str,
    ) -> ComposerResult<PathBuf> {
        let prepend = self
            .write_launch_env_file(&format!("{}.prepend", name), value)
            .await?;
        self.write_launch_env_file(&format!("{}.delim", name), delim)
            .await?;
        Ok(prepend)
    }

    async fn write_launch_env_file(&self, file_name: &str, value: &str) -> ComposerResult<PathBuf> {
        let dir = self.root().join(LAUNCH_ENV_DIR);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ComposerError::io(format!("creating {}", dir.display()), e))?;

        let path = dir.join(file_name);
        fs::write(&path, value)
            .await
            .map_err(|e| ComposerError::io(format!("writing {}", path.display()), e))?;
        Ok(path)
    }
}
