//! The metadata block stored alongside an artifact's payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::record::BuildRecord;

/// A string key/value store that build steps write provenance into.
pub trait MetadataSink {
    /// Sets `key` to `value`, overwriting any previous value.
    fn set_string(&mut self, key: &str, value: &str);
}

/// Everything an artifact records about how it was built.
///
/// Encoded with bincode and placed in the arena after the payload; the
/// artifact header points at it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Per-resource stamps used for freshness checks.
    pub build_info: BuildRecord,
    /// Free-form string entries such as provenance fields.
    pub entries: BTreeMap<String, String>,
}

impl ArtifactMetadata {
    /// Creates metadata with the given build record and no entries.
    pub fn new(build_info: BuildRecord) -> Self {
        Self {
            build_info,
            entries: BTreeMap::new(),
        }
    }

    /// Returns the value stored under `key`.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterates over the entries whose key starts with `prefix/`, yielding the
    /// remainder of the key.
    pub fn entries_under<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries.iter().filter_map(move |(k, v)| {
            k.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| (rest, v.as_str()))
        })
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, BuildError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
            BuildError::Serialization {
                reason: e.to_string(),
            }
        })
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, BuildError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(metadata, _)| metadata)
            .map_err(|e| BuildError::Serialization {
                reason: e.to_string(),
            })
    }
}

impl MetadataSink for ArtifactMetadata {
    fn set_string(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

impl MetadataSink for BTreeMap<String, String> {
    fn set_string(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}
