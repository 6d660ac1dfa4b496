//! Whole-artifact builds with capacity retry and atomic replacement.

use std::path::{Path, PathBuf};

use inkstone_arena::{ArenaStore, ArenaValue, OffsetRef, MAX_CAPACITY};

use crate::artifact::ArtifactHeader;
use crate::error::BuildError;
use crate::metadata::ArtifactMetadata;

/// Default initial arena capacity (1 MiB).
pub const DEFAULT_INITIAL_CAPACITY: usize = 1 << 20;

/// Default factor the capacity grows by after an exhausted attempt.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Final artifact path.
    pub path: PathBuf,
    /// Artifact size in bytes after shrinking.
    pub size: usize,
    /// Number of attempts, including the successful one.
    pub attempts: u32,
}

/// Builds an artifact into a staging file and renames it into place.
///
/// The payload writer runs against a freshly created arena. If it (or the
/// metadata that follows it) runs out of space the attempt is thrown away and
/// retried with a larger arena, so the writer must be repeatable.
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    initial_capacity: usize,
    growth_factor: usize,
    max_capacity: usize,
    payload_kind: u32,
}

impl Default for ArtifactBuilder {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_capacity: MAX_CAPACITY,
            payload_kind: 0,
        }
    }
}

impl ArtifactBuilder {
    /// Creates a builder with default capacities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity of the first attempt.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the growth factor between attempts. Values below 2 are raised to 2.
    pub fn with_growth_factor(mut self, factor: usize) -> Self {
        self.growth_factor = factor.max(2);
        self
    }

    /// Sets the largest capacity to try, clamped to [`MAX_CAPACITY`].
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = capacity.min(MAX_CAPACITY);
        self
    }

    /// Sets the payload kind tag recorded in the header.
    pub fn with_payload_kind(mut self, kind: u32) -> Self {
        self.payload_kind = kind;
        self
    }

    /// Builds the artifact at `destination`.
    ///
    /// `write_payload` writes the payload and returns its root. `metadata` is
    /// stored after the payload. The destination is only replaced once the
    /// staging file is complete, flushed and shrunk; on failure the staging
    /// file is removed and any existing artifact is left untouched.
    pub fn build<T, F>(
        &self,
        destination: &Path,
        metadata: &ArtifactMetadata,
        mut write_payload: F,
    ) -> Result<BuildOutcome, BuildError>
    where
        T: ArenaValue,
        F: FnMut(&mut ArenaStore) -> Result<OffsetRef<T>, BuildError>,
    {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let staging = staging_path(destination);
        let mut store = ArenaStore::new(&staging);
        let mut capacity = self.initial_capacity.clamp(1, self.max_capacity.max(1));
        let mut attempts = 0;

        let size = loop {
            attempts += 1;
            match self.attempt(&mut store, capacity, metadata, &mut write_payload) {
                Ok(size) => break size,
                Err(e) if e.is_exhausted() && capacity < self.max_capacity => {
                    let next = capacity
                        .saturating_mul(self.growth_factor)
                        .min(self.max_capacity);
                    tracing::info!(capacity, next, "arena exhausted, retrying build");
                    capacity = next;
                }
                Err(e) => {
                    if let Err(cleanup) = store.remove() {
                        tracing::warn!(error = %cleanup, "cannot remove staging file");
                    }
                    if e.is_exhausted() {
                        return Err(BuildError::CapacityLimit { capacity });
                    }
                    return Err(e);
                }
            }
        };

        std::fs::rename(&staging, destination).map_err(|e| BuildError::Io {
            path: destination.to_path_buf(),
            source: e,
        })?;
        tracing::info!(
            path = %destination.display(),
            size,
            attempts,
            "built artifact"
        );
        Ok(BuildOutcome {
            path: destination.to_path_buf(),
            size,
            attempts,
        })
    }

    fn attempt<T, F>(
        &self,
        store: &mut ArenaStore,
        capacity: usize,
        metadata: &ArtifactMetadata,
        write_payload: &mut F,
    ) -> Result<usize, BuildError>
    where
        T: ArenaValue,
        F: FnMut(&mut ArenaStore) -> Result<OffsetRef<T>, BuildError>,
    {
        store.create(capacity)?;
        let header = store.push(ArtifactHeader::new(self.payload_kind))?;
        let root = write_payload(store)?;

        let encoded = metadata.encode()?;
        let block = store.allocate_slice(&encoded)?;
        let header = store.get_mut(header)?;
        header.set_payload_root(root.offset());
        header.set_metadata_range(block.offset(), encoded.len() as u32);

        let size = store.size();
        store.flush()?;
        store.shrink_to_fit()?;
        Ok(size)
    }
}

/// Returns `<destination>.tmp`.
fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
