//! Memory-mapped arena file lifecycle and bump allocation.
//!
//! ## States
//!
//! ```text
//! Closed ──create/open_read_write──▶ ReadWrite ──close──▶ Closed
//! Closed ──open_read_only──────────▶ ReadOnly  ──close──▶ Closed
//! ```
//!
//! ## Reference safety
//!
//! Values are reached through [`ArenaStore::get`] and friends, which borrow
//! the store. Every operation that invalidates the mapping (`close`, `resize`,
//! `shrink_to_fit`, `remove`, re-`create`) takes `&mut self`, so the borrow
//! checker rejects any reference into the old mapping that is still alive.
//! [`OffsetRef`] values themselves stay valid across remaps of the same file;
//! they are offsets, not addresses.

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::mem::{align_of, size_of};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};
use zerocopy::{FromBytes, IntoBytes};

use crate::error::ArenaError;
use crate::offset::{ArenaValue, OffsetRef, StringRef};

/// Largest capacity addressable by a 32-bit [`OffsetRef`].
pub const MAX_CAPACITY: usize = u32::MAX as usize;

/// How an arena is currently mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Mapped read-only; the whole file counts as allocated.
    ReadOnly,
    /// Mapped read-write; allocation appends after `size`.
    ReadWrite,
}

enum Region {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl Region {
    fn as_slice(&self) -> &[u8] {
        match self {
            Region::ReadOnly(m) => &m[..],
            Region::ReadWrite(m) => &m[..],
        }
    }
}

struct Mapping {
    region: Region,
    // Held so the descriptor is released together with the mapping.
    _file: File,
}

/// A file-backed bump allocator addressed by [`OffsetRef`].
///
/// One writer builds the file; any number of independent read-only handles
/// may map it once the writer has flushed and closed. No locking is done
/// here; callers serialize builds of the same file.
pub struct ArenaStore {
    path: PathBuf,
    mapping: Option<Mapping>,
    size: usize,
}

impl ArenaStore {
    /// Creates a closed handle for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mapping: None,
            size: 0,
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns `true` while a mapping is held.
    pub fn is_open(&self) -> bool {
        self.mapping.is_some()
    }

    /// Returns the current mapping mode, if open.
    pub fn mode(&self) -> Option<OpenMode> {
        self.mapping.as_ref().map(|m| match m.region {
            Region::ReadOnly(_) => OpenMode::ReadOnly,
            Region::ReadWrite(_) => OpenMode::ReadWrite,
        })
    }

    /// Creates (or overwrites) the file with exactly `capacity` bytes and maps
    /// it read-write with nothing allocated.
    ///
    /// An existing file is resized in place; its old content is not
    /// guaranteed to survive. A new file is created sparse.
    pub fn create(&mut self, capacity: usize) -> Result<(), ArenaError> {
        if capacity == 0 {
            return Err(ArenaError::InvalidArgument(
                "arena capacity must be non-zero".to_string(),
            ));
        }
        if capacity > MAX_CAPACITY {
            return Err(ArenaError::InvalidArgument(format!(
                "arena capacity {capacity} exceeds the {MAX_CAPACITY}-byte offset range"
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(ArenaError::InvalidArgument("empty arena path".to_string()));
        }

        if self.exists() {
            tracing::info!(path = %self.path.display(), capacity, "overwriting arena file");
            self.resize(capacity)?;
        } else {
            tracing::info!(path = %self.path.display(), capacity, "creating arena file");
            self.close();
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .map_err(|e| self.io_error(e))?;
            file.set_len(capacity as u64)
                .map_err(|e| self.io_error(e))?;
        }

        self.map(OpenMode::ReadWrite)?;
        self.size = 0;
        Ok(())
    }

    /// Maps an existing file read-only. The whole file counts as allocated.
    pub fn open_read_only(&mut self) -> Result<(), ArenaError> {
        self.require_existing()?;
        self.map(OpenMode::ReadOnly)?;
        self.size = self.capacity();
        Ok(())
    }

    /// Maps an existing file read-write with nothing allocated, so new
    /// allocations overwrite from offset 0 into the existing capacity.
    pub fn open_read_write(&mut self) -> Result<(), ArenaError> {
        self.require_existing()?;
        self.map(OpenMode::ReadWrite)?;
        self.size = 0;
        Ok(())
    }

    /// Forces written pages out to the backing file.
    ///
    /// A no-op for read-only mappings.
    pub fn flush(&self) -> Result<(), ArenaError> {
        match &self.mapping {
            None => Err(ArenaError::NotOpen),
            Some(Mapping {
                region: Region::ReadWrite(mmap),
                ..
            }) => mmap.flush().map_err(|e| self.io_error(e)),
            Some(_) => Ok(()),
        }
    }

    /// Closes any mapping, then truncates or extends the file to exactly
    /// `new_capacity` bytes. The store is left closed.
    ///
    /// An open mapping is dropped first, so every view borrowed from it must
    /// already be gone; the borrow checker enforces this through `&mut self`.
    /// Offsets past `new_capacity` no longer resolve after reopening.
    pub fn resize(&mut self, new_capacity: usize) -> Result<(), ArenaError> {
        if new_capacity > MAX_CAPACITY {
            return Err(ArenaError::InvalidArgument(format!(
                "arena capacity {new_capacity} exceeds the {MAX_CAPACITY}-byte offset range"
            )));
        }
        tracing::info!(path = %self.path.display(), new_capacity, "resizing arena file");
        self.close();
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| self.open_error(e))?;
        file.set_len(new_capacity as u64)
            .map_err(|e| self.io_error(e))
    }

    /// Shrinks the file to the allocated size. The store is left closed.
    ///
    /// Fails with [`ArenaError::NotOpen`] on a closed store, whose allocated
    /// size is unknown.
    pub fn shrink_to_fit(&mut self) -> Result<(), ArenaError> {
        if !self.is_open() {
            return Err(ArenaError::NotOpen);
        }
        let size = self.size;
        tracing::info!(
            path = %self.path.display(),
            capacity = self.capacity(),
            size,
            "shrinking arena file to fit data"
        );
        self.resize(size)
    }

    /// Unmaps the file and releases its handle. Safe to call when closed.
    pub fn close(&mut self) {
        if self.mapping.take().is_some() {
            tracing::debug!(path = %self.path.display(), "closed arena");
        }
        self.size = 0;
    }

    /// Closes the store and deletes the backing file. A missing file is not
    /// an error.
    pub fn remove(&mut self) -> Result<(), ArenaError> {
        self.close();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Returns the number of allocated bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the mapped length, or 0 when closed.
    pub fn capacity(&self) -> usize {
        self.mapping
            .as_ref()
            .map_or(0, |m| m.region.as_slice().len())
    }

    /// Returns the bytes left for allocation.
    pub fn available(&self) -> usize {
        self.capacity().saturating_sub(self.size)
    }

    /// Returns the base address of the current mapping, or null when closed.
    ///
    /// The address changes from one mapping to the next; persist
    /// [`OffsetRef`] values, never addresses.
    pub fn address(&self) -> *const u8 {
        self.mapping
            .as_ref()
            .map_or(std::ptr::null(), |m| m.region.as_slice().as_ptr())
    }

    /// Returns the allocated region `[0, size)`.
    pub fn allocated_bytes(&self) -> Result<&[u8], ArenaError> {
        Ok(&self.bytes()?[..self.size])
    }

    /// Reserves space for `count` consecutive `T` values, zero-filled.
    ///
    /// The start is aligned for `T`; alignment padding counts toward `size`.
    /// Fails with [`ArenaError::AllocationExhausted`] if the request does not
    /// fit, leaving `size` and all written content untouched.
    pub fn allocate<T: ArenaValue>(&mut self, count: usize) -> Result<OffsetRef<T>, ArenaError> {
        if count == 0 || size_of::<T>() == 0 {
            return Err(ArenaError::InvalidArgument(
                "zero-length allocation".to_string(),
            ));
        }
        self.ensure_writable()?;
        let capacity = self.capacity();
        let available = capacity.saturating_sub(self.size);
        let exhausted = |requested| ArenaError::AllocationExhausted {
            requested,
            available,
        };

        let requested = size_of::<T>()
            .checked_mul(count)
            .ok_or_else(|| exhausted(usize::MAX))?;
        let start = self.size.next_multiple_of(align_of::<T>());
        let end = start
            .checked_add(requested)
            .filter(|&end| end <= capacity)
            .ok_or_else(|| {
                tracing::debug!(requested, available, "arena allocation exhausted");
                exhausted(requested)
            })?;

        let old_size = self.size;
        let bytes = self.bytes_mut()?;
        bytes[old_size..end].fill(0);
        self.size = end;
        Ok(OffsetRef::new(start as u32))
    }

    /// Reserves `count` values and copies `values` into them.
    pub fn allocate_slice<T: ArenaValue>(
        &mut self,
        values: &[T],
    ) -> Result<OffsetRef<T>, ArenaError> {
        let r = self.allocate::<T>(values.len())?;
        self.get_slice_mut(r, values.len())?
            .as_mut_bytes()
            .copy_from_slice(values.as_bytes());
        Ok(r)
    }

    /// Reserves space for one `T` and writes `value` into it.
    pub fn push<T: ArenaValue>(&mut self, value: T) -> Result<OffsetRef<T>, ArenaError> {
        let r = self.allocate::<T>(1)?;
        *self.get_mut(r)? = value;
        Ok(r)
    }

    /// Copies `text` into the arena followed by a NUL terminator.
    ///
    /// Text containing an interior NUL is rejected since it could not be read
    /// back intact.
    pub fn create_string(&mut self, text: &str) -> Result<StringRef, ArenaError> {
        if text.as_bytes().contains(&0) {
            return Err(ArenaError::InvalidArgument(
                "string contains an interior NUL byte".to_string(),
            ));
        }
        let r = self.allocate::<u8>(text.len() + 1)?;
        let dest = self.get_slice_mut(r, text.len())?;
        dest.copy_from_slice(text.as_bytes());
        Ok(StringRef::new(r))
    }

    /// Borrows the `T` at `r`.
    pub fn get<T: ArenaValue>(&self, r: OffsetRef<T>) -> Result<&T, ArenaError> {
        let range = self.checked_range(r.offset(), size_of::<T>())?;
        T::ref_from_bytes(&self.bytes()?[range]).map_err(|_| self.misaligned(r.offset()))
    }

    /// Mutably borrows the `T` at `r`. Requires a writable mapping.
    pub fn get_mut<T: ArenaValue>(&mut self, r: OffsetRef<T>) -> Result<&mut T, ArenaError> {
        let range = self.checked_range(r.offset(), size_of::<T>())?;
        let err = self.misaligned(r.offset());
        T::mut_from_bytes(&mut self.bytes_mut()?[range]).map_err(|_| err)
    }

    /// Borrows `count` consecutive values starting at `r`.
    pub fn get_slice<T: ArenaValue>(
        &self,
        r: OffsetRef<T>,
        count: usize,
    ) -> Result<&[T], ArenaError> {
        let range = self.checked_range(r.offset(), slice_len::<T>(count))?;
        <[T]>::ref_from_bytes(&self.bytes()?[range]).map_err(|_| self.misaligned(r.offset()))
    }

    /// Mutably borrows `count` consecutive values starting at `r`.
    pub fn get_slice_mut<T: ArenaValue>(
        &mut self,
        r: OffsetRef<T>,
        count: usize,
    ) -> Result<&mut [T], ArenaError> {
        let range = self.checked_range(r.offset(), slice_len::<T>(count))?;
        let err = self.misaligned(r.offset());
        <[T]>::mut_from_bytes(&mut self.bytes_mut()?[range]).map_err(|_| err)
    }

    /// Reads the NUL-terminated string at `s`.
    pub fn get_str(&self, s: StringRef) -> Result<&str, ArenaError> {
        let offset = s.bytes().offset();
        let range = self.checked_range(offset, 1)?;
        let tail = &self.bytes()?[range.start..self.size];
        CStr::from_bytes_until_nul(tail)
            .ok()
            .and_then(|c| c.to_str().ok())
            .ok_or(ArenaError::InvalidString { offset })
    }

    fn checked_range(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>, ArenaError> {
        let invalid = || ArenaError::InvalidOffset {
            offset,
            len,
            size: self.size,
        };
        if self.mapping.is_none() {
            return Err(ArenaError::NotOpen);
        }
        if offset == u32::MAX {
            return Err(invalid());
        }
        let start = offset as usize;
        let end = start.checked_add(len).ok_or_else(invalid)?;
        if end > self.size {
            return Err(invalid());
        }
        Ok(start..end)
    }

    fn misaligned(&self, offset: u32) -> ArenaError {
        ArenaError::InvalidOffset {
            offset,
            len: 0,
            size: self.size,
        }
    }

    fn bytes(&self) -> Result<&[u8], ArenaError> {
        self.mapping
            .as_ref()
            .map(|m| m.region.as_slice())
            .ok_or(ArenaError::NotOpen)
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8], ArenaError> {
        match &mut self.mapping {
            None => Err(ArenaError::NotOpen),
            Some(Mapping {
                region: Region::ReadOnly(_),
                ..
            }) => Err(ArenaError::ReadOnly),
            Some(Mapping {
                region: Region::ReadWrite(mmap),
                ..
            }) => Ok(&mut mmap[..]),
        }
    }

    fn ensure_writable(&self) -> Result<(), ArenaError> {
        match self.mode() {
            None => Err(ArenaError::NotOpen),
            Some(OpenMode::ReadOnly) => Err(ArenaError::ReadOnly),
            Some(OpenMode::ReadWrite) => Ok(()),
        }
    }

    fn require_existing(&self) -> Result<(), ArenaError> {
        if self.exists() {
            Ok(())
        } else {
            tracing::error!(path = %self.path.display(), "attempt to open non-existent arena file");
            Err(ArenaError::NotFound {
                path: self.path.clone(),
            })
        }
    }

    fn map(&mut self, mode: OpenMode) -> Result<(), ArenaError> {
        self.close();
        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::ReadWrite)
            .open(&self.path)
            .map_err(|e| self.open_error(e))?;

        let map_error = |source| ArenaError::Map {
            path: self.path.clone(),
            source,
        };
        // SAFETY: mapping a file is unsafe because another process could
        // truncate or modify it underneath us. Artifacts are built by a single
        // writer and replaced by rename, never edited in place while mapped
        // read-only, and every access goes through bounds-checked accessors
        // whose borrows end before the mapping can be dropped.
        let region = match mode {
            OpenMode::ReadOnly => Region::ReadOnly(unsafe { Mmap::map(&file) }.map_err(map_error)?),
            OpenMode::ReadWrite => {
                Region::ReadWrite(unsafe { MmapMut::map_mut(&file) }.map_err(map_error)?)
            }
        };
        tracing::debug!(
            path = %self.path.display(),
            ?mode,
            len = region.as_slice().len(),
            "mapped arena"
        );
        self.mapping = Some(Mapping {
            region,
            _file: file,
        });
        Ok(())
    }

    fn open_error(&self, source: std::io::Error) -> ArenaError {
        if source.kind() == ErrorKind::NotFound {
            ArenaError::NotFound {
                path: self.path.clone(),
            }
        } else {
            self.io_error(source)
        }
    }

    fn io_error(&self, source: std::io::Error) -> ArenaError {
        ArenaError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn slice_len<T>(count: usize) -> usize {
    size_of::<T>().saturating_mul(count)
}

impl Drop for ArenaStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ArenaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaStore")
            .field("path", &self.path)
            .field("mode", &self.mode())
            .field("size", &self.size)
            .field("capacity", &self.capacity())
            .finish()
    }
}
