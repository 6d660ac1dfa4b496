//! Per-resource build state embedded in every artifact.

use std::collections::BTreeMap;

use inkstone_common::Timestamp;
use serde::{Deserialize, Serialize};

/// What was observed about one source resource when the artifact was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStamp {
    /// Last-modified time in seconds since the epoch, or `0` when the resource
    /// was not loaded or not persisted.
    pub timestamp: Timestamp,
    /// CRC-32 of the file contents, if it could be computed.
    pub checksum: Option<u32>,
}

impl ResourceStamp {
    /// The "always rebuild" stamp for unloaded or unpersisted resources.
    pub const UNBUILT: Self = Self {
        timestamp: 0,
        checksum: None,
    };

    /// Creates a stamp.
    pub fn new(timestamp: Timestamp, checksum: Option<u32>) -> Self {
        Self {
            timestamp,
            checksum,
        }
    }

    /// Returns `true` for the zero-timestamp sentinel.
    pub fn is_unbuilt(&self) -> bool {
        self.timestamp == 0
    }
}

/// The build record of one artifact.
///
/// Keyed by resource id; a `BTreeMap` keeps the encoded form deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Version of the engine that produced the artifact.
    pub engine_version: String,
    /// Opaque distribution identity supplied by the embedding application.
    pub distribution: String,
    /// Stamps for every resource that went into the artifact.
    pub resources: BTreeMap<String, ResourceStamp>,
}

impl BuildRecord {
    /// Creates an empty record for the given engine version.
    pub fn new(engine_version: &str) -> Self {
        Self {
            engine_version: engine_version.to_string(),
            distribution: String::new(),
            resources: BTreeMap::new(),
        }
    }

    /// Sets the distribution identity.
    pub fn with_distribution(mut self, distribution: &str) -> Self {
        self.distribution = distribution.to_string();
        self
    }

    /// Records (or replaces) the stamp for `resource_id`.
    pub fn insert(&mut self, resource_id: &str, stamp: ResourceStamp) {
        self.resources.insert(resource_id.to_string(), stamp);
    }

    /// Returns the stamp recorded for `resource_id`.
    pub fn get(&self, resource_id: &str) -> Option<&ResourceStamp> {
        self.resources.get(resource_id)
    }

    /// Returns the number of recorded resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if no resource has been recorded.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
