//! Layer lifecycle
//!
//! A layer is a directory under the CNB layers root plus a `<name>.toml`
//! metadata file. The `[metadata]` table records the identity the layer was
//! built for; contributing with equal metadata reuses the layer untouched.
//!
//! # Layer States
//!
//! | Recorded metadata | Requested | Outcome |
//! |-------------------|-----------|---------|
//! | none | F | populate, record F |
//! | F | F | reused, nothing runs |
//! | F' | F | populate, record F |
//!
//! A failed populate leaves the recorded metadata as it was, so the next
//! build retries.

pub mod env;
pub mod metadata;

pub use metadata::{LayerContentMetadata, LayerLifetime, RawLayerMetadata};

use crate::error::{ComposerError, ComposerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Outcome of a layer contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// Recorded metadata matched; populate was skipped
    Reused,
    /// Populate ran and the new metadata was recorded
    Recontributed,
}

/// The CNB layers root handed to `bin/build`
#[derive(Debug, Clone)]
pub struct Layers {
    root: PathBuf,
}

impl Layers {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Handle to the named layer (nothing is created on disk)
    pub fn layer(&self, name: &str) -> Layer {
        Layer {
            name: name.to_string(),
            root: self.root.join(name),
            metadata_path: self.root.join(format!("{}.toml", name)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A single named layer
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    root: PathBuf,
    metadata_path: PathBuf,
}

impl Layer {
    /// Layer contents directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the `<name>.toml` metadata file
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Empty the layer directory and forget any recorded metadata
    ///
    /// Used for scratch layers whose contents must not carry over from a
    /// previous build.
    pub async fn reset(&self) -> ComposerResult<()> {
        if self.metadata_path.exists() {
            fs::remove_file(&self.metadata_path).await.map_err(|e| {
                ComposerError::io(
                    format!("removing layer metadata {}", self.metadata_path.display()),
                    e,
                )
            })?;
        }
        if self.root.exists() {
            debug!("Clearing layer {}", self.name);
            fs::remove_dir_all(&self.root).await.map_err(|e| {
                ComposerError::io(format!("clearing layer {}", self.root.display()), e)
            })?;
        }
        fs::create_dir_all(&self.root).await.map_err(|e| {
            ComposerError::io(format!("creating layer {}", self.root.display()), e)
        })
    }

    /// Read the metadata recorded by a previous contribution
    ///
    /// Returns `None` when no metadata file exists or when its `[metadata]`
    /// table does not have the requested shape.
    pub async fn recorded_metadata<M: DeserializeOwned>(&self) -> ComposerResult<Option<M>> {
        if !self.metadata_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.metadata_path).await.map_err(|e| {
            ComposerError::io(
                format!("reading layer metadata {}", self.metadata_path.display()),
                e,
            )
        })?;

        let parsed = match RawLayerMetadata::parse(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Ignoring unreadable metadata for layer {}: {}", self.name, e);
                return Ok(None);
            }
        };

        Ok(parsed.metadata_as())
    }

    /// Contribute the layer for `metadata`
    ///
    /// `populate` only runs when the recorded metadata differs from the
    /// requested one. The metadata file is written after `populate` succeeds.
    pub async fn contribute<M, F, Fut>(
        &self,
        metadata: &M,
        lifetimes: &[LayerLifetime],
        populate: F,
    ) -> ComposerResult<Contribution>
    where
        M: Serialize + DeserializeOwned + PartialEq + fmt::Display,
        F: FnOnce(Layer) -> Fut,
        Fut: Future<Output = ComposerResult<()>>,
    {
        if let Some(recorded) = self.recorded_metadata::<M>().await? {
            if &recorded == metadata {
                info!("{}: Reusing cached layer", metadata);
                return Ok(Contribution::Reused);
            }
            debug!("Layer {} was built for {}", self.name, recorded);
        }

        info!("{}: Contributing to layer", metadata);
        fs::create_dir_all(&self.root).await.map_err(|e| {
            ComposerError::io(format!("creating layer {}", self.root.display()), e)
        })?;

        populate(self.clone()).await?;

        let content = LayerContentMetadata::new(lifetimes, metadata).render()?;
        fs::write(&self.metadata_path, content).await.map_err(|e| {
            ComposerError::io(
                format!("writing layer metadata {}", self.metadata_path.display()),
                e,
            )
        })?;

        Ok(Contribution::Recontributed)
    }
}
