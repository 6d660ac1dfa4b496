//! Configuration types deserialized from `inkstone.toml`.

use std::path::{Path, PathBuf};

use inkstone_resource::{FallbackResourceLocator, ResourceKind};
use serde::Deserialize;

use crate::error::ConfigError;

/// Largest arena capacity a 32-bit offset can address.
pub const OFFSET_LIMIT: usize = u32::MAX as usize;

/// The top-level configuration parsed from `inkstone.toml`.
#[derive(Debug, Deserialize)]
pub struct InkstoneConfig {
    /// Where sources and artifacts live.
    pub paths: PathsConfig,
    /// Declared resource naming conventions.
    #[serde(default)]
    pub resource_kinds: Vec<ResourceKind>,
    /// Arena sizing for builds.
    #[serde(default)]
    pub arena: ArenaConfig,
    /// Freshness check settings.
    #[serde(default)]
    pub freshness: FreshnessConfig,
    /// Distribution identity stamped into artifacts.
    #[serde(default)]
    pub distribution: DistributionConfig,
}

/// Filesystem roots.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    /// Primary resource root, usually the user's data directory.
    pub user_data_dir: PathBuf,
    /// Shared read-only resource root searched when a file is absent from
    /// `user_data_dir`.
    #[serde(default)]
    pub shared_data_dir: Option<PathBuf>,
    /// Artifact output directory, relative to `user_data_dir` unless absolute.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("build")
}

/// Arena sizing for artifact builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Capacity of the first build attempt in bytes.
    pub initial_capacity: usize,
    /// Factor the capacity grows by after an attempt runs out of space.
    pub growth_factor: usize,
    /// Largest capacity to attempt.
    pub max_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1 << 20,
            growth_factor: 2,
            max_capacity: OFFSET_LIMIT,
        }
    }
}

/// Freshness check settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// Treat a content change behind an unchanged timestamp as stale.
    pub verify_checksums: bool,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// Distribution identity. Opaque strings, stored but never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Distribution name.
    pub name: String,
    /// Distribution code name.
    pub code_name: String,
    /// Distribution version.
    pub version: String,
}

impl DistributionConfig {
    /// Returns a single-line identity such as `"Inkstone Stonebridge 0.3.0"`.
    pub fn identity(&self) -> String {
        [&self.name, &self.code_name, &self.version]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl InkstoneConfig {
    /// Returns the resource kind declared under `name`.
    pub fn resource_kind(&self, name: &str) -> Option<&ResourceKind> {
        self.resource_kinds.iter().find(|k| k.name == name)
    }

    /// Builds a locator for the named kind rooted at `user_data_dir`, falling
    /// back to `shared_data_dir` when configured.
    pub fn locator(&self, kind: &str) -> Result<FallbackResourceLocator, ConfigError> {
        let kind = self
            .resource_kind(kind)
            .ok_or_else(|| ConfigError::UnknownKind(kind.to_string()))?;
        let mut locator =
            FallbackResourceLocator::new(kind.clone()).with_root(&self.paths.user_data_dir);
        locator.set_fallback_root_path(self.paths.shared_data_dir.clone());
        Ok(locator)
    }

    /// Returns the artifact output directory.
    pub fn staging_dir(&self) -> PathBuf {
        self.paths.user_data_dir.join(&self.paths.staging_dir)
    }

    /// Returns the default artifact path for a build named `name`.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.staging_dir().join(format!("{name}.bin"))
    }

    /// Makes relative roots relative to `base`.
    pub(crate) fn anchor_paths(&mut self, base: &Path) {
        if self.paths.user_data_dir.is_relative() {
            self.paths.user_data_dir = base.join(&self.paths.user_data_dir);
        }
        if let Some(shared) = &self.paths.shared_data_dir {
            if shared.is_relative() {
                self.paths.shared_data_dir = Some(base.join(shared));
            }
        }
    }
}
