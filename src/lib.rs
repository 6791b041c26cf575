//! PHP Composer Cloud Native Buildpack
//!
//! Installs Composer packages into layers keyed on the composer.lock
//! fingerprint, so unchanged dependencies are never installed twice.

pub mod buildplan;
pub mod cli;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fingerprint;
pub mod ini;
pub mod layer;
pub mod manifest;
pub mod packages;
pub mod runner;
pub mod tool;

pub use error::{ComposerError, ComposerResult};
