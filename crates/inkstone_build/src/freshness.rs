//! Deciding whether a compiled artifact can be reused.
//!
//! At link time [`BuildFreshnessTracker::record`] stamps every source resource
//! with its modification time and checksum. On the next build
//! [`BuildFreshnessTracker::check`] compares those stamps against the current
//! state of the same resources and lists whatever changed. Any failure to
//! observe a resource degrades to "rebuild", never to an error.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use inkstone_common::{checksum_of_file, compare_version_strings, last_write_time, Timestamp};
use inkstone_resource::ResolvePath;

use crate::artifact::read_metadata;
use crate::metadata::ArtifactMetadata;
use crate::record::{BuildRecord, ResourceStamp};

/// One source resource as the compiler sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResource {
    /// Logical resource id.
    pub id: String,
    /// Resolved file path, or `None` if the resource has no backing file.
    pub path: Option<PathBuf>,
    /// Whether the compiler successfully loaded the resource.
    pub loaded: bool,
}

impl SourceResource {
    /// A loaded resource backed by `path`.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: Some(path.into()),
            loaded: true,
        }
    }

    /// A resource that exists only in memory.
    pub fn unpersisted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
            loaded: true,
        }
    }

    /// Resolves `id` through `locator`. The resource counts as loaded when
    /// the resolved file exists.
    pub fn locate(locator: &dyn ResolvePath, id: &str) -> Self {
        let path = locator.resolve_path(id);
        let exists = path.is_file();
        Self {
            id: id.to_string(),
            path: exists.then_some(path),
            loaded: exists,
        }
    }

    /// Marks the resource as failed to load.
    pub fn not_loaded(mut self) -> Self {
        self.loaded = false;
        self
    }

    /// Returns the backing file if it currently exists.
    fn existing_path(&self) -> Option<&Path> {
        self.path.as_deref().filter(|p| p.exists())
    }
}

/// Why a resource makes an artifact stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The resource existed at build time but is gone now.
    Missing,
    /// The resource was absent or unbuilt at build time but exists now.
    NewlyPresent,
    /// The modification time differs from the recorded one.
    TimestampChanged {
        /// Recorded modification time.
        recorded: Timestamp,
        /// Current modification time.
        current: Timestamp,
    },
    /// The modification time matches but the contents differ.
    ChecksumChanged,
    /// The resource is in use now but absent from the build record.
    NotRecorded,
    /// The build record lists a resource that is no longer in use.
    Removed,
    /// The resource exists but currently cannot be loaded, or has no
    /// backing file to compare against.
    Unbuilt,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Missing => write!(f, "source no longer exists"),
            StaleReason::NewlyPresent => write!(f, "source appeared since last build"),
            StaleReason::TimestampChanged { recorded, current } => {
                write!(f, "modified (recorded {recorded}, now {current})")
            }
            StaleReason::ChecksumChanged => write!(f, "contents changed"),
            StaleReason::NotRecorded => write!(f, "not part of last build"),
            StaleReason::Removed => write!(f, "no longer used"),
            StaleReason::Unbuilt => write!(f, "not loaded"),
        }
    }
}

/// Outcome of comparing a build record with the current resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreshnessReport {
    /// Resources that force a rebuild, in record-then-input order.
    pub stale: Vec<(String, StaleReason)>,
    /// Set when the artifact was produced by a newer engine than this one.
    pub newer_engine: Option<String>,
}

impl FreshnessReport {
    /// Returns `true` if the artifact can be reused as is.
    pub fn is_fresh(&self) -> bool {
        self.stale.is_empty() && self.newer_engine.is_none()
    }
}

/// Records and validates per-resource build state.
#[derive(Debug, Clone)]
pub struct BuildFreshnessTracker {
    engine_version: String,
    distribution: String,
    verify_checksums: bool,
}

impl BuildFreshnessTracker {
    /// Creates a tracker for the running engine. Checksums are verified.
    pub fn new(engine_version: &str) -> Self {
        Self {
            engine_version: engine_version.to_string(),
            distribution: String::new(),
            verify_checksums: true,
        }
    }

    /// Sets the distribution identity written into new records.
    pub fn with_distribution(mut self, distribution: &str) -> Self {
        self.distribution = distribution.to_string();
        self
    }

    /// Enables or disables the checksum comparison in [`Self::check`].
    /// Checksums are recorded either way.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Returns the running engine version.
    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Stamps every resource into `metadata.build_info`, replacing any
    /// previous record.
    pub fn record(&self, metadata: &mut ArtifactMetadata, resources: &[SourceResource]) {
        metadata.build_info = self.build_record(resources);
    }

    /// Builds a fresh record from the current state of `resources`.
    ///
    /// Unloaded and unpersisted resources get the zero-timestamp sentinel so
    /// the next check always rebuilds.
    pub fn build_record(&self, resources: &[SourceResource]) -> BuildRecord {
        let mut record =
            BuildRecord::new(&self.engine_version).with_distribution(&self.distribution);
        for resource in resources {
            record.insert(&resource.id, stamp_resource(resource));
        }
        record
    }

    /// Compares `record` against the current state of `resources`.
    pub fn check(&self, record: &BuildRecord, resources: &[SourceResource]) -> FreshnessReport {
        let mut report = FreshnessReport::default();

        if compare_version_strings(&record.engine_version, &self.engine_version)
            == Ordering::Greater
        {
            tracing::debug!(
                recorded = %record.engine_version,
                running = %self.engine_version,
                "artifact built by a newer engine"
            );
            report.newer_engine = Some(record.engine_version.clone());
        }

        for id in record.resources.keys() {
            if !resources.iter().any(|r| &r.id == id) {
                report.stale.push((id.clone(), StaleReason::Removed));
            }
        }

        for resource in resources {
            let reason = match record.get(&resource.id) {
                Some(stamp) => self.compare(stamp, resource),
                None => Some(StaleReason::NotRecorded),
            };
            match reason {
                Some(reason) => {
                    tracing::debug!(resource = %resource.id, %reason, "stale");
                    report.stale.push((resource.id.clone(), reason));
                }
                None => tracing::debug!(resource = %resource.id, "fresh"),
            }
        }
        report
    }

    /// Returns `true` only if nothing in [`Self::check`] forces a rebuild.
    pub fn is_fresh(&self, record: &BuildRecord, resources: &[SourceResource]) -> bool {
        self.check(record, resources).is_fresh()
    }

    /// Reads the record stored in the artifact at `artifact_path` and checks
    /// it. An artifact that is missing or unreadable is never fresh.
    pub fn is_artifact_fresh(&self, artifact_path: &Path, resources: &[SourceResource]) -> bool {
        match read_metadata(artifact_path) {
            Ok(metadata) => self.is_fresh(&metadata.build_info, resources),
            Err(e) => {
                tracing::debug!(path = %artifact_path.display(), error = %e, "no usable build record");
                false
            }
        }
    }

    fn compare(&self, stamp: &ResourceStamp, resource: &SourceResource) -> Option<StaleReason> {
        if resource.loaded && resource.path.is_none() {
            // In-memory resources cannot be observed, so they always rebuild.
            return Some(StaleReason::Unbuilt);
        }
        let Some(path) = resource.existing_path() else {
            // Absent then and now is consistent.
            return (!stamp.is_unbuilt()).then_some(StaleReason::Missing);
        };
        if !resource.loaded {
            return Some(StaleReason::Unbuilt);
        }
        if stamp.is_unbuilt() {
            return Some(StaleReason::NewlyPresent);
        }

        let current = last_write_time(path).unwrap_or(0);
        if current != stamp.timestamp {
            return Some(StaleReason::TimestampChanged {
                recorded: stamp.timestamp,
                current,
            });
        }

        if self.verify_checksums {
            if let Some(recorded) = stamp.checksum {
                if checksum_of_file(path).ok() != Some(recorded) {
                    return Some(StaleReason::ChecksumChanged);
                }
            }
        }
        None
    }
}

fn stamp_resource(resource: &SourceResource) -> ResourceStamp {
    if !resource.loaded {
        tracing::info!(resource = %resource.id, "resource not loaded");
        return ResourceStamp::UNBUILT;
    }
    let Some(path) = resource.path.as_deref() else {
        tracing::warn!(resource = %resource.id, "resource is not persisted");
        return ResourceStamp::UNBUILT;
    };
    let Some(timestamp) = last_write_time(path) else {
        tracing::warn!(resource = %resource.id, path = %path.display(), "cannot stat resource");
        return ResourceStamp::UNBUILT;
    };
    let checksum = match checksum_of_file(path) {
        Ok(sum) => Some(sum),
        Err(e) => {
            tracing::warn!(resource = %resource.id, error = %e, "cannot checksum resource");
            None
        }
    };
    ResourceStamp::new(timestamp, checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkstone_common::set_last_write_time;
    use inkstone_resource::{ResourceKind, ResourceLocator};

    const T1: Timestamp = 1_700_000_000;
    const T2: Timestamp = 1_700_000_100;

    fn write(path: &Path, contents: &str, mtime: Timestamp) {
        std::fs::write(path, contents).unwrap();
        set_last_write_time(path, mtime).unwrap();
    }

    fn setup() -> (tempfile::TempDir, PathBuf, BuildFreshnessTracker) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("luna.dict.yaml");
        write(&path, "v1", T1);
        (dir, path, BuildFreshnessTracker::new("1.2.0"))
    }

    #[test]
    fn record_stamps_time_and_checksum() {
        let (_dir, path, tracker) = setup();
        let record = tracker.build_record(&[SourceResource::new("luna", &path)]);
        let stamp = record.get("luna").unwrap();
        assert_eq!(stamp.timestamp, T1);
        assert_eq!(stamp.checksum, Some(inkstone_common::crc32(b"v1")));
        assert_eq!(record.engine_version, "1.2.0");
    }

    #[test]
    fn record_unloaded_and_unpersisted_as_zero() {
        let (_dir, path, tracker) = setup();
        let record = tracker.build_record(&[
            SourceResource::new("luna", &path).not_loaded(),
            SourceResource::unpersisted("memory"),
        ]);
        assert_eq!(record.get("luna"), Some(&ResourceStamp::UNBUILT));
        assert_eq!(record.get("memory"), Some(&ResourceStamp::UNBUILT));
    }

    #[test]
    fn record_unstattable_as_zero() {
        let (dir, _path, tracker) = setup();
        let gone = dir.path().join("gone.dict.yaml");
        let resources = [SourceResource::new("gone", &gone)];

        let record = tracker.build_record(&resources);
        assert_eq!(record.get("gone"), Some(&ResourceStamp::UNBUILT));
        assert!(tracker.is_fresh(&record, &resources));

        write(&gone, "appeared", T1);
        let report = tracker.check(&record, &resources);
        assert_eq!(
            report.stale,
            vec![("gone".to_string(), StaleReason::NewlyPresent)]
        );
    }

    #[test]
    fn record_into_metadata() {
        let (_dir, path, tracker) = setup();
        let mut metadata = ArtifactMetadata::default();
        tracker.record(&mut metadata, &[SourceResource::new("luna", &path)]);
        assert_eq!(metadata.build_info.len(), 1);
    }

    #[test]
    fn unchanged_is_fresh() {
        let (_dir, path, tracker) = setup();
        let resources = [SourceResource::new("luna", &path)];
        let record = tracker.build_record(&resources);
        assert!(tracker.is_fresh(&record, &resources));
    }

    #[test]
    fn timestamp_change_is_stale() {
        let (_dir, path, tracker) = setup();
        let resources = [SourceResource::new("luna", &path)];
        let record = tracker.build_record(&resources);

        set_last_write_time(&path, T2).unwrap();
        let report = tracker.check(&record, &resources);
        assert_eq!(
            report.stale,
            vec![(
                "luna".to_string(),
                StaleReason::TimestampChanged {
                    recorded: T1,
                    current: T2
                }
            )]
        );
    }

    #[test]
    fn same_timestamp_different_contents() {
        let (_dir, path, tracker) = setup();
        let resources = [SourceResource::new("luna", &path)];
        let record = tracker.build_record(&resources);

        write(&path, "v2", T1);
        let report = tracker.check(&record, &resources);
        assert_eq!(
            report.stale,
            vec![("luna".to_string(), StaleReason::ChecksumChanged)]
        );

        let lenient = tracker.clone().verify_checksums(false);
        assert!(lenient.is_fresh(&record, &resources));
    }

    #[test]
    fn missing_checksum_is_not_compared() {
        let (_dir, path, tracker) = setup();
        let mut record = BuildRecord::new("1.2.0");
        record.insert("luna", ResourceStamp::new(T1, None));
        assert!(tracker.is_fresh(&record, &[SourceResource::new("luna", &path)]));
    }

    #[test]
    fn deleted_resource_is_missing() {
        let (_dir, path, tracker) = setup();
        let resources = [SourceResource::new("luna", &path)];
        let record = tracker.build_record(&resources);

        std::fs::remove_file(&path).unwrap();
        let report = tracker.check(&record, &resources);
        assert_eq!(report.stale, vec![("luna".to_string(), StaleReason::Missing)]);
    }

    #[test]
    fn absent_then_and_now_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ResourceLocator::new(ResourceKind::new("dict", "", ".dict.yaml"))
            .with_root(dir.path());
        let tracker = BuildFreshnessTracker::new("1.0");

        let resources = [SourceResource::locate(&locator, "optional")];
        assert!(resources[0].path.is_none());
        let record = tracker.build_record(&resources);
        assert!(tracker.is_fresh(&record, &resources));

        // Creating the file afterwards invalidates the artifact.
        write(&dir.path().join("optional.dict.yaml"), "x", T1);
        let now = [SourceResource::locate(&locator, "optional")];
        assert_eq!(
            tracker.check(&record, &now).stale,
            vec![("optional".to_string(), StaleReason::NewlyPresent)]
        );
    }

    #[test]
    fn present_but_unloaded_is_stale() {
        let (_dir, path, tracker) = setup();
        let resources = [SourceResource::new("luna", &path)];
        let record = tracker.build_record(&resources);
        let now = [SourceResource::new("luna", &path).not_loaded()];
        assert_eq!(
            tracker.check(&record, &now).stale,
            vec![("luna".to_string(), StaleReason::Unbuilt)]
        );
    }

    #[test]
    fn unpersisted_is_never_fresh() {
        let tracker = BuildFreshnessTracker::new("1.0");
        let resources = [SourceResource::unpersisted("memory")];
        let record = tracker.build_record(&resources);
        assert_eq!(
            tracker.check(&record, &resources).stale,
            vec![("memory".to_string(), StaleReason::Unbuilt)]
        );
    }

    #[test]
    fn resource_set_changes_are_stale() {
        let (dir, path, tracker) = setup();
        let other = dir.path().join("extra.dict.yaml");
        write(&other, "extra", T1);

        let record = tracker.build_record(&[SourceResource::new("luna", &path)]);
        let report = tracker.check(&record, &[SourceResource::new("extra", &other)]);
        assert_eq!(
            report.stale,
            vec![
                ("luna".to_string(), StaleReason::Removed),
                ("extra".to_string(), StaleReason::NotRecorded),
            ]
        );
    }

    #[test]
    fn newer_engine_is_never_fresh() {
        let (_dir, path, tracker) = setup();
        let resources = [SourceResource::new("luna", &path)];
        let mut record = tracker.build_record(&resources);

        record.engine_version = "1.10.0".to_string();
        let report = tracker.check(&record, &resources);
        assert!(report.stale.is_empty());
        assert_eq!(report.newer_engine.as_deref(), Some("1.10.0"));
        assert!(!report.is_fresh());

        record.engine_version = "1.1.9".to_string();
        assert!(tracker.is_fresh(&record, &resources));
    }

    #[test]
    fn unreadable_artifact_is_not_fresh() {
        let (dir, path, tracker) = setup();
        let resources = [SourceResource::new("luna", &path)];
        assert!(!tracker.is_artifact_fresh(&dir.path().join("missing.bin"), &resources));

        let garbage = dir.path().join("garbage.bin");
        std::fs::write(&garbage, b"not an artifact").unwrap();
        assert!(!tracker.is_artifact_fresh(&garbage, &resources));
    }

    #[test]
    fn stale_reason_display() {
        assert_eq!(StaleReason::Missing.to_string(), "source no longer exists");
        assert_eq!(
            StaleReason::TimestampChanged {
                recorded: 1,
                current: 2
            }
            .to_string(),
            "modified (recorded 1, now 2)"
        );
    }
}
