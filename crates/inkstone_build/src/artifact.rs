//! Compiled artifact layout and read-side access.
//!
//! ```text
//! 0        64                                   metadata_offset     end
//! ├─header─┼──────────── payload (arena) ────────────┼──metadata──┤
//! ```
//!
//! The 64-byte [`ArtifactHeader`] sits at arena offset 0 and locates both the
//! payload root and the bincode-encoded [`ArtifactMetadata`] block. The
//! metadata can be read with plain file I/O, without mapping the payload.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::mem::size_of;
use std::path::Path;

use inkstone_arena::{ArenaError, ArenaStore, ArenaValue, OffsetRef};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::BuildError;
use crate::metadata::ArtifactMetadata;
use crate::record::BuildRecord;

/// Magic bytes identifying an Inkstone artifact.
pub const ARTIFACT_MAGIC: [u8; 8] = *b"INKSTONE";

/// Current artifact format version. Increment on breaking changes to the
/// header or metadata encoding.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Size of [`ArtifactHeader`] on disk.
pub const ARTIFACT_HEADER_SIZE: usize = 64;

/// Fixed header at offset 0 of every artifact.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ArtifactHeader {
    magic: [u8; 8],
    format_version: U32<LittleEndian>,
    payload_kind: U32<LittleEndian>,
    metadata_offset: U32<LittleEndian>,
    metadata_len: U32<LittleEndian>,
    payload_root: U32<LittleEndian>,
    reserved: [u8; 36],
}

const _: () = assert!(size_of::<ArtifactHeader>() == ARTIFACT_HEADER_SIZE);

impl ArtifactHeader {
    /// Creates a header for a payload of the given kind with nothing located yet.
    pub fn new(payload_kind: u32) -> Self {
        Self {
            magic: ARTIFACT_MAGIC,
            format_version: U32::new(ARTIFACT_FORMAT_VERSION),
            payload_kind: U32::new(payload_kind),
            metadata_offset: U32::new(0),
            metadata_len: U32::new(0),
            payload_root: U32::new(u32::MAX),
            reserved: [0; 36],
        }
    }

    /// Returns the format version recorded in the file.
    pub fn format_version(&self) -> u32 {
        self.format_version.get()
    }

    /// Returns the caller-defined payload kind tag.
    pub fn payload_kind(&self) -> u32 {
        self.payload_kind.get()
    }

    /// Returns the byte range of the metadata block as `(offset, len)`.
    pub fn metadata_range(&self) -> (u32, u32) {
        (self.metadata_offset.get(), self.metadata_len.get())
    }

    /// Returns the offset of the payload's root value.
    pub fn payload_root(&self) -> u32 {
        self.payload_root.get()
    }

    pub(crate) fn set_metadata_range(&mut self, offset: u32, len: u32) {
        self.metadata_offset = U32::new(offset);
        self.metadata_len = U32::new(len);
    }

    pub(crate) fn set_payload_root(&mut self, offset: u32) {
        self.payload_root = U32::new(offset);
    }

    /// Checks magic, version and that the metadata block lies inside a file
    /// of `file_len` bytes.
    fn validate(&self, path: &Path, file_len: u64) -> Result<(), BuildError> {
        if self.magic != ARTIFACT_MAGIC {
            return Err(invalid_header(path, "missing magic bytes"));
        }
        if self.format_version() != ARTIFACT_FORMAT_VERSION {
            return Err(BuildError::VersionMismatch {
                path: path.to_path_buf(),
                expected: ARTIFACT_FORMAT_VERSION,
                actual: self.format_version(),
            });
        }
        let (offset, len) = self.metadata_range();
        let end = offset as u64 + len as u64;
        if (offset as usize) < ARTIFACT_HEADER_SIZE || len == 0 || end > file_len {
            return Err(invalid_header(
                path,
                &format!("metadata block {offset}+{len} outside file of {file_len} bytes"),
            ));
        }
        Ok(())
    }
}

/// Reads only the header and metadata block of the artifact at `path`.
///
/// The payload is never read or mapped, so this stays cheap for large
/// dictionaries.
pub fn read_metadata(path: &Path) -> Result<ArtifactMetadata, BuildError> {
    let io_error = |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_error)?;
    let file_len = file.metadata().map_err(io_error)?.len();

    let mut header_bytes = [0u8; ARTIFACT_HEADER_SIZE];
    if file_len < ARTIFACT_HEADER_SIZE as u64 {
        return Err(invalid_header(path, "file shorter than header"));
    }
    file.read_exact(&mut header_bytes).map_err(io_error)?;
    let header = ArtifactHeader::read_from_bytes(&header_bytes)
        .map_err(|_| invalid_header(path, "unreadable header"))?;
    header.validate(path, file_len)?;

    let (offset, len) = header.metadata_range();
    let mut block = vec![0u8; len as usize];
    file.seek(SeekFrom::Start(offset as u64))
        .map_err(io_error)?;
    file.read_exact(&mut block).map_err(io_error)?;
    ArtifactMetadata::decode(&block)
}

/// A compiled artifact mapped read-only.
///
/// ```no_run
/// # use inkstone_arena::OffsetRef;
/// # fn main() -> Result<(), inkstone_build::BuildError> {
/// let artifact = inkstone_build::Artifact::open("build/luna.table.bin".as_ref())?;
/// let root: OffsetRef<u32> = artifact.payload_root();
/// let first = artifact.store().get(root)?;
/// # let _ = first;
/// # Ok(())
/// # }
/// ```
pub struct Artifact {
    store: ArenaStore,
    header: ArtifactHeader,
    metadata: ArtifactMetadata,
}

impl Artifact {
    /// Maps the artifact at `path`, validates its header and decodes its
    /// metadata.
    pub fn open(path: &Path) -> Result<Self, BuildError> {
        let mut store = ArenaStore::new(path);
        store.open_read_only()?;

        let header = match store.get(OffsetRef::<ArtifactHeader>::new(0)) {
            Ok(header) => *header,
            Err(ArenaError::InvalidOffset { .. }) => {
                return Err(invalid_header(path, "file shorter than header"))
            }
            Err(e) => return Err(e.into()),
        };
        header.validate(path, store.size() as u64)?;

        let (offset, len) = header.metadata_range();
        let block = store.get_slice(OffsetRef::<u8>::new(offset), len as usize)?;
        let metadata = ArtifactMetadata::decode(block)?;
        tracing::debug!(
            path = %path.display(),
            size = store.size(),
            resources = metadata.build_info.len(),
            "opened artifact"
        );

        Ok(Self {
            store,
            header,
            metadata,
        })
    }

    /// Returns the artifact's path.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Returns the validated header.
    pub fn header(&self) -> &ArtifactHeader {
        &self.header
    }

    /// Returns the decoded metadata block.
    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    /// Returns the build record stored in the metadata block.
    pub fn build_record(&self) -> &BuildRecord {
        &self.metadata.build_info
    }

    /// Returns the payload root, typed as the caller expects it.
    ///
    /// The header stores an untyped offset; check
    /// [`ArtifactHeader::payload_kind`] before trusting `T`.
    pub fn payload_root<T: ArenaValue>(&self) -> OffsetRef<T> {
        OffsetRef::new(self.header.payload_root())
    }

    /// Returns the read-only arena for dereferencing payload offsets.
    pub fn store(&self) -> &ArenaStore {
        &self.store
    }

    /// Returns the file size in bytes.
    pub fn len(&self) -> usize {
        self.store.size()
    }

    /// Returns `true` for an empty file. A valid artifact is never empty.
    pub fn is_empty(&self) -> bool {
        self.store.size() == 0
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("path", &self.path())
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

fn invalid_header(path: &Path, reason: &str) -> BuildError {
    BuildError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
