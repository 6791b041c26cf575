//! Lock file fingerprinting for layer reuse
//!
//! A fingerprint is the SHA256 of the lock file contents. When a project has
//! no lock file its dependencies are unpinned, so the fingerprint is derived
//! from random bytes instead and never matches a previous build.

use crate::error::{ComposerError, ComposerResult};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Size of the random buffer hashed when no lock file exists
const RANDOM_SEED_LEN: usize = 512;

/// Hex characters of the hash shown in log lines
const SHORT_HASH_LEN: usize = 12;

/// Content hash used as the identity of a layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Human-readable label shown in build logs
    pub name: String,
    /// Lowercase hex SHA256 digest
    pub hash: String,
}

impl Fingerprint {
    /// Fingerprint the exact bytes of a file
    pub fn from_file(name: impl Into<String>, path: &Path) -> ComposerResult<Self> {
        let contents = fs::read(path).map_err(|e| {
            ComposerError::io(format!("reading lock file {}", path.display()), e)
        })?;

        debug!("Fingerprinting {} ({} bytes)", path.display(), contents.len());
        Ok(Self::from_bytes(name, &contents))
    }

    /// Fingerprint a buffer drawn from the OS random source
    pub fn random(name: impl Into<String>) -> Self {
        let mut seed = [0u8; RANDOM_SEED_LEN];
        OsRng.fill_bytes(&mut seed);
        Self::from_bytes(name, &seed)
    }

    /// Fingerprint the lock file when there is one, otherwise a random buffer
    pub fn for_lock_file(
        name: impl Into<String>,
        lock_path: Option<&Path>,
    ) -> ComposerResult<Self> {
        match lock_path {
            Some(path) => Self::from_file(name, path),
            None => {
                debug!("No lock file, using a random fingerprint");
                Ok(Self::random(name))
            }
        }
    }

    fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            name: name.into(),
            hash: hex::encode(hasher.finalize()),
        }
    }

    /// Leading hex characters, for log lines
    pub fn short_hash(&self) -> &str {
        self.hash.get(..SHORT_HASH_LEN).unwrap_or(&self.hash)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.short_hash())
    }
}
