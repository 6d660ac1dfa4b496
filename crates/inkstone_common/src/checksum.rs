//! Streaming whole-file CRC-32 checksums.
//!
//! Uses the reflected IEEE polynomial (0xEDB88320) with an initial register of
//! `0xFFFFFFFF` and a final XOR of `0xFFFFFFFF`, which is the checksum used by
//! zip, PNG and gzip. Files are read through a fixed 64 KiB buffer so memory use
//! does not depend on file size.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Reflected CRC-32 polynomial (IEEE 802.3).
const CRC32_POLY: u32 = 0xEDB8_8320;

/// Size of the read buffer used by [`checksum_of_file`].
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Process-wide lookup table, derived from the polynomial on first use.
static CRC32_TABLE: LazyLock<[u32; 256]> = LazyLock::new(build_table);

fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = i as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC32_POLY
            } else {
                crc >> 1
            };
        }
        *entry = crc;
    }
    table
}

/// Error returned when a file cannot be checksummed.
#[derive(Debug, thiserror::Error)]
#[error("cannot checksum {path}: {source}")]
pub struct ChecksumError {
    /// The file that could not be read.
    pub path: PathBuf,
    /// The underlying I/O error.
    pub source: std::io::Error,
}

/// Incremental CRC-32 state.
///
/// Feed bytes with [`update`](Self::update) in any number of chunks; the
/// result depends only on the concatenated byte sequence.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    register: u32,
}

impl Crc32 {
    /// Creates a hasher with the initial register value.
    pub fn new() -> Self {
        Self {
            register: 0xFFFF_FFFF,
        }
    }

    /// Folds `data` into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        let table = &*CRC32_TABLE;
        let mut crc = self.register;
        for &byte in data {
            crc = table[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
        }
        self.register = crc;
    }

    /// Returns the checksum of all bytes seen so far.
    pub fn finalize(&self) -> u32 {
        self.register ^ 0xFFFF_FFFF
    }

    /// Resets the hasher to its initial state.
    pub fn reset(&mut self) {
        self.register = 0xFFFF_FFFF;
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the CRC-32 of an in-memory byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    hasher.finalize()
}

/// Computes the CRC-32 of a file's full contents.
///
/// A short read at end-of-file simply ends the loop. Interrupted reads are
/// retried.
pub fn checksum_of_file(path: &Path) -> Result<u32, ChecksumError> {
    let to_error = |source| ChecksumError {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(to_error)?;
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut hasher = Crc32::new();
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(to_error(e)),
        }
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_reference_entries() {
        assert_eq!(CRC32_TABLE[0], 0);
        assert_eq!(CRC32_TABLE[1], 0x7707_3096);
        assert_eq!(CRC32_TABLE[255], 0x2D02_EF8D);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32(&[]), 0x0000_0000);
    }

    #[test]
    fn check_value() {
        // Standard CRC-32 check value for the ASCII digits 1..9.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn chunked_update_matches_one_shot() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut hasher = Crc32::new();
        for chunk in data.chunks(5) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize(), crc32(data));
        assert_eq!(hasher.finalize(), 0x414F_A339);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut hasher = Crc32::new();
        hasher.update(b"garbage");
        hasher.reset();
        hasher.update(b"123456789");
        assert_eq!(hasher.finalize(), 0xCBF4_3926);
    }

    #[test]
    fn file_checksum_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("luna_pinyin.dict.yaml");
        std::fs::write(&path, "ni\t你\nhao\t好\n").unwrap();

        let a = checksum_of_file(&path).unwrap();
        let b = checksum_of_file(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, crc32("ni\t你\nhao\t好\n".as_bytes()));
    }

    #[test]
    fn single_byte_flip_changes_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let mut data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();
        let before = checksum_of_file(&path).unwrap();

        // Flip a byte beyond the first read buffer.
        data[150_000] ^= 0x01;
        std::fs::write(&path, &data).unwrap();
        let after = checksum_of_file(&path).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn empty_file_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(checksum_of_file(&path).unwrap(), 0);
    }

    #[test]
    fn missing_file_errors() {
        let err = checksum_of_file(Path::new("/nonexistent/file.dict.yaml")).unwrap_err();
        assert_eq!(err.source.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("file.dict.yaml"));
    }
}
