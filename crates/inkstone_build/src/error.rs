//! Error types for artifact builds and reads.

use std::path::PathBuf;

use inkstone_arena::ArenaError;

/// Errors that can occur while building or reading a compiled artifact.
///
/// Freshness checks never surface these: an artifact that cannot be read is
/// simply not fresh. They reach callers of [`crate::ArtifactBuilder`] and
/// [`crate::Artifact::open`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The underlying arena failed.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// An I/O error occurred outside the arena (staging, rename, header read).
    #[error("build I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is too short, has the wrong magic, or points outside itself.
    #[error("invalid artifact header in {path}: {reason}")]
    InvalidHeader {
        /// The artifact file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The artifact format version does not match the current version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The artifact file path.
        path: PathBuf,
        /// The format version this build understands.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// The metadata block could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The payload did not fit even at the largest allowed capacity.
    #[error("artifact does not fit in {capacity} bytes")]
    CapacityLimit {
        /// The capacity of the last attempt.
        capacity: usize,
    },
}

impl BuildError {
    /// Returns `true` if retrying with a larger arena could succeed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, BuildError::Arena(e) if e.is_exhausted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_error_is_transparent() {
        let err = BuildError::from(ArenaError::NotOpen);
        assert_eq!(err.to_string(), "arena is not open");
        assert!(!err.is_exhausted());
    }

    #[test]
    fn exhausted_arena_error_is_retryable() {
        let err = BuildError::from(ArenaError::AllocationExhausted {
            requested: 10,
            available: 2,
        });
        assert!(err.is_exhausted());
    }

    #[test]
    fn invalid_header_display() {
        let err = BuildError::InvalidHeader {
            path: PathBuf::from("build/luna.table.bin"),
            reason: "bad magic".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid artifact header"));
        assert!(msg.contains("luna.table.bin"));
        assert!(msg.contains("bad magic"));
    }

    #[test]
    fn version_mismatch_display() {
        let err = BuildError::VersionMismatch {
            path: PathBuf::from("old.bin"),
            expected: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 1"));
    }

    #[test]
    fn capacity_limit_display() {
        let err = BuildError::CapacityLimit { capacity: 4096 };
        assert_eq!(err.to_string(), "artifact does not fit in 4096 bytes");
    }
}
