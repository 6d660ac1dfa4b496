//! Shared helpers for CLI commands.
//!
//! Config discovery, source location, tracker construction and artifact path
//! defaults used by `build` and `check`.

use std::path::{Path, PathBuf};

use inkstone_build::{BuildFreshnessTracker, SourceResource};
use inkstone_config::{InkstoneConfig, CONFIG_FILE};
use inkstone_resource::ResolvePath;

use crate::GlobalArgs;

/// Engine version recorded in and compared against build records.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metadata key prefix for provenance entries.
pub const SIGNATURE_PREFIX: &str = "signature";

/// Generator name stamped into artifacts.
pub const GENERATOR: &str = "inkstone";

/// Returns the nearest of `start` and its ancestors that holds `inkstone.toml`.
pub fn find_config_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Resolves the directory holding `inkstone.toml`.
///
/// `--config` may name the file itself or its directory. Without it the
/// current directory and its ancestors are searched.
pub fn resolve_config_dir(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match global.config.as_deref().map(Path::new) {
        Some(file) if file.is_file() => Ok(file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()),
        Some(dir) => Ok(dir.to_path_buf()),
        None => {
            let cwd = std::env::current_dir()?;
            find_config_dir(&cwd).ok_or_else(|| {
                format!("no {CONFIG_FILE} in {} or its parents", cwd.display()).into()
            })
        }
    }
}

/// Finds and loads the configuration.
pub fn load(global: &GlobalArgs) -> Result<InkstoneConfig, Box<dyn std::error::Error>> {
    let dir = resolve_config_dir(global)?;
    Ok(inkstone_config::load_config(&dir)?)
}

/// Locates each resource id through `locator`.
pub fn locate_sources(locator: &dyn ResolvePath, ids: &[String]) -> Vec<SourceResource> {
    ids.iter()
        .map(|id| SourceResource::locate(locator, id))
        .collect()
}

/// Builds a tracker configured from `config` for the running engine.
pub fn tracker(config: &InkstoneConfig) -> BuildFreshnessTracker {
    BuildFreshnessTracker::new(ENGINE_VERSION)
        .with_distribution(&config.distribution.identity())
        .verify_checksums(config.freshness.verify_checksums)
}

/// Returns `output` when given, else `<staging_dir>/<first id>.<kind>.bin`.
pub fn output_path(
    config: &InkstoneConfig,
    kind: &str,
    ids: &[String],
    output: Option<&str>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(output) = output {
        return Ok(PathBuf::from(output));
    }
    let first = ids.first().ok_or("no resource ids given")?;
    Ok(config.artifact_path(&format!("{first}.{kind}")))
}
