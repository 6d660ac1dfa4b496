//! Build-freshness tracking and artifact assembly.
//!
//! A compiled artifact is one arena file holding a fixed header, the
//! structural payload written by the compiler, and a metadata block that
//! records how it was built. This crate writes that layout
//! ([`ArtifactBuilder`]), reads it back ([`Artifact`], [`read_metadata`]),
//! records and checks per-resource build state ([`BuildFreshnessTracker`]),
//! and stamps provenance ([`ProvenanceStamp`]).
//!
//! A typical incremental build:
//!
//! ```no_run
//! use inkstone_build::{
//!     ArtifactBuilder, ArtifactMetadata, BuildFreshnessTracker, ProvenanceStamp, SourceResource,
//! };
//! use inkstone_resource::{ResourceKind, ResourceLocator};
//!
//! # fn main() -> Result<(), inkstone_build::BuildError> {
//! let locator = ResourceLocator::new(ResourceKind::new("dict", "", ".dict.yaml"))
//!     .with_root("/usr/share/inkstone");
//! let resources = vec![SourceResource::locate(&locator, "luna_pinyin")];
//! let artifact = std::path::Path::new("build/luna_pinyin.table.bin");
//!
//! let tracker = BuildFreshnessTracker::new("0.1.0");
//! if !tracker.is_artifact_fresh(artifact, &resources) {
//!     let mut metadata = ArtifactMetadata::default();
//!     tracker.record(&mut metadata, &resources);
//!     ProvenanceStamp::new("signature", "example").stamp(&mut metadata, "", "", "0.1.0");
//!     ArtifactBuilder::new().build(artifact, &metadata, |store| {
//!         Ok(store.create_string("payload")?.bytes())
//!     })?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod artifact;
pub mod builder;
pub mod error;
pub mod freshness;
pub mod metadata;
pub mod provenance;
pub mod record;

pub use artifact::{
    read_metadata, Artifact, ArtifactHeader, ARTIFACT_FORMAT_VERSION, ARTIFACT_HEADER_SIZE,
    ARTIFACT_MAGIC,
};
pub use builder::{ArtifactBuilder, BuildOutcome, DEFAULT_GROWTH_FACTOR, DEFAULT_INITIAL_CAPACITY};
pub use error::BuildError;
pub use freshness::{BuildFreshnessTracker, FreshnessReport, SourceResource, StaleReason};
pub use metadata::{ArtifactMetadata, MetadataSink};
pub use provenance::{format_build_time, ProvenanceStamp};
pub use record::{BuildRecord, ResourceStamp};
