//! Error types for the Composer buildpack
//!
//! All modules use `ComposerResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildpack operations
pub type ComposerResult<T> = Result<T, ComposerError>;

/// All errors that can occur while detecting or building
#[derive(Error, Debug)]
pub enum ComposerError {
    // Project errors
    #[error("no \"composer.json\" found at: {searched}")]
    ManifestNotFound { searched: String },

    #[error("PHP installation not found: {0}")]
    PhpNotFound(String),

    #[error("composer.phar not found at {0}")]
    PharNotFound(PathBuf),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid buildpack plan at {path}: {reason}")]
    BuildPlanInvalid { path: PathBuf, reason: String },

    // Credential errors
    #[error("GitHub token verification failed: {0}")]
    CredentialCheck(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Failed to start `{command}` in {}", dir.display())]
    CommandLaunch {
        command: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "`{command}` failed in {} ({}){}",
        dir.display(),
        exit_description(*code),
        stderr_suffix(stderr)
    )]
    CommandExecution {
        command: String,
        dir: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    // Serialization errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{}", trimmed)
    }
}

impl ComposerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command launch error
    pub fn launch(
        command: impl Into<String>,
        dir: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::CommandLaunch {
            command: command.into(),
            dir: dir.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn execution(
        command: impl Into<String>,
        dir: impl Into<PathBuf>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandExecution {
            command: command.into(),
            dir: dir.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestNotFound { .. } => Some(
                "Add a composer.json to the application root, or point to it with COMPOSER or composer.json_path in buildpack.yml",
            ),
            Self::PhpNotFound(_) => {
                Some("Make sure the PHP buildpack runs before the Composer buildpack")
            }
            Self::PharNotFound(_) => Some("Set BP_COMPOSER_PHAR to the location of composer.phar"),
            Self::CredentialCheck(_) => Some(
                "Unset COMPOSER_GITHUB_OAUTH_TOKEN to build without GitHub authentication",
            ),
            Self::ConfigInvalid { .. } => Some("Check the syntax of buildpack.yml"),
            _ => None,
        }
    }
}
