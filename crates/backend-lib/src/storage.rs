// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Per-user platform configuration sources.
//!
//! The flat-file source keeps one TOML file per user at
//! `<root>/<school>/<url-escaped username>.cfg`, with a table per platform:
//!
//! ```toml
//! [daymap]
//! hotp_key = "JBSWY3DPEHPK3PXP"
//! ```
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use taskcollect_common::UserConfig;
use tokio::fs as tokio_fs;
use tracing::debug;

use crate::error::AppError;
use crate::validation::validate_school;

/// Per-platform configuration for one user, keyed by platform name
pub type PlatformConfigs = HashMap<String, UserConfig>;

/// Trait for per-user configuration backends
#[async_trait]
pub trait UserConfigSource: Send + Sync {
    /// Load the configuration of `username` at `school`.
    ///
    /// A user without any stored configuration gets an empty map.
    async fn load(&self, school: &str, username: &str) -> Result<PlatformConfigs, AppError>;
}

/// Flat-file implementation of [`UserConfigSource`]
#[derive(Clone, Debug)]
pub struct FlatFileConfigSource {
    root: PathBuf,
}

impl FlatFileConfigSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Location of the configuration file for `username` at `school`
    pub fn path_for(&self, school: &str, username: &str) -> Result<PathBuf, AppError> {
        validate_school(school)?;
        let file = format!("{}.cfg", urlencoding::encode(username));
        Ok(self.root.join(school).join(file))
    }
}

#[async_trait]
impl UserConfigSource for FlatFileConfigSource {
    async fn load(&self, school: &str, username: &str) -> Result<PlatformConfigs, AppError> {
        let path = self.path_for(school, username)?;

        let content = match tokio_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no user configuration");
                return Ok(PlatformConfigs::new());
            },
            Err(e) => return Err(e.into()),
        };

        Figment::from(Toml::string(&content))
            .extract()
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
    }
}

/// Source that never has any configuration
#[derive(Clone, Debug, Default)]
pub struct NoUserConfig;

#[async_trait]
impl UserConfigSource for NoUserConfig {
    async fn load(&self, _school: &str, _username: &str) -> Result<PlatformConfigs, AppError> {
        Ok(PlatformConfigs::new())
    }
}
