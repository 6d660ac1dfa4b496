//! Error types for arena storage.

use std::path::PathBuf;

/// Errors that can occur while creating, mapping, or allocating in an arena.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// The backing file does not exist but an open required it.
    #[error("arena file not found: {path}")]
    NotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// The backing file could not be opened, sized, synced, or removed.
    #[error("arena I/O error at {path}: {source}")]
    Io {
        /// The file that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file could not be memory-mapped.
    #[error("cannot map arena file {path}: {source}")]
    Map {
        /// The file that could not be mapped.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An allocation would run past the reserved capacity.
    ///
    /// Already-written content is untouched; retry with a larger capacity.
    #[error("arena exhausted: requested {requested} bytes, {available} available")]
    AllocationExhausted {
        /// Bytes the allocation asked for.
        requested: usize,
        /// Bytes left between the current size and capacity.
        available: usize,
    },

    /// An argument was empty, zero, or out of the supported range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation requires an open mapping.
    #[error("arena is not open")]
    NotOpen,

    /// The operation requires a writable mapping.
    #[error("arena is mapped read-only")]
    ReadOnly,

    /// An offset does not address a complete value inside the allocated region.
    #[error("offset {offset} (+{len} bytes) is outside the allocated region of {size} bytes")]
    InvalidOffset {
        /// The offending offset.
        offset: u32,
        /// Number of bytes the access needed.
        len: usize,
        /// Current allocated size.
        size: usize,
    },

    /// Bytes at a string offset are not a terminated UTF-8 string.
    #[error("no valid string at offset {offset}")]
    InvalidString {
        /// The offending offset.
        offset: u32,
    },
}

impl ArenaError {
    /// Returns `true` for failures at the operating-system boundary.
    pub fn is_io(&self) -> bool {
        matches!(self, ArenaError::Io { .. } | ArenaError::Map { .. })
    }

    /// Returns `true` if the error is recoverable by retrying with more capacity.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ArenaError::AllocationExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = ArenaError::Io {
            path: PathBuf::from("/tmp/build/luna.table.bin"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("arena I/O error"));
        assert!(msg.contains("luna.table.bin"));
        assert!(err.is_io());
    }

    #[test]
    fn map_error_is_io() {
        let err = ArenaError::Map {
            path: PathBuf::from("x"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "ENOMEM"),
        };
        assert!(err.is_io());
        assert!(!err.is_exhausted());
    }

    #[test]
    fn exhausted_display() {
        let err = ArenaError::AllocationExhausted {
            requested: 4096,
            available: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("4096"));
        assert!(msg.contains("100 available"));
        assert!(err.is_exhausted());
        assert!(!err.is_io());
    }

    #[test]
    fn invalid_offset_display() {
        let err = ArenaError::InvalidOffset {
            offset: 64,
            len: 8,
            size: 32,
        };
        assert_eq!(
            err.to_string(),
            "offset 64 (+8 bytes) is outside the allocated region of 32 bytes"
        );
    }

    #[test]
    fn not_found_display() {
        let err = ArenaError::NotFound {
            path: PathBuf::from("missing.bin"),
        };
        assert!(err.to_string().contains("missing.bin"));
    }
}
