//! Shared foundational types used across the Inkstone dictionary toolchain.
//!
//! This crate provides whole-file CRC-32 checksums, engine version comparison,
//! and modification-time helpers used by the build-freshness machinery.

#![warn(missing_docs)]

pub mod checksum;
pub mod timestamp;
pub mod version;

pub use checksum::{checksum_of_file, crc32, ChecksumError, Crc32};
pub use timestamp::{last_write_time, set_last_write_time, Timestamp};
pub use version::compare_version_strings;
