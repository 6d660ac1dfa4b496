//! Typed offsets into an arena.
//!
//! An [`OffsetRef<T>`] is what gets persisted in place of a pointer. It is only
//! meaningful relative to the [`ArenaStore`](crate::ArenaStore) that produced
//! it (or a later mapping of the same file) and can only be turned into a
//! reference through that store, which ties the reference's lifetime to the
//! mapping.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Plain-old-data types that can live inside an arena.
///
/// Any bit pattern must be a valid value (so zero-filled and foreign memory
/// can be read), and the type must have no padding or interior mutability.
pub trait ArenaValue: FromBytes + IntoBytes + Immutable + KnownLayout {}

impl<T: FromBytes + IntoBytes + Immutable + KnownLayout> ArenaValue for T {}

/// Byte offset of a `T` from the start of an arena.
///
/// Stored as 32 bits, which caps arenas at 4 GiB. `u32::MAX` is reserved as
/// the null offset, so a zeroed link field is *not* null; initialise link
/// fields with [`OffsetRef::NULL`] explicitly.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct OffsetRef<T> {
    offset: u32,
    _marker: PhantomData<T>,
}

impl<T> OffsetRef<T> {
    /// The null offset.
    pub const NULL: Self = Self {
        offset: u32::MAX,
        _marker: PhantomData,
    };

    /// Wraps a raw byte offset.
    pub const fn new(offset: u32) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    /// Returns the raw byte offset.
    pub const fn offset(self) -> u32 {
        self.offset
    }

    /// Returns `true` for the null offset.
    pub const fn is_null(self) -> bool {
        self.offset == u32::MAX
    }

    /// Returns the offset of the `index`-th element of an array starting here.
    pub fn element(self, index: usize) -> Option<Self> {
        if self.is_null() {
            return None;
        }
        let delta = index.checked_mul(std::mem::size_of::<T>())?;
        let offset = (self.offset as usize).checked_add(delta)?;
        u32::try_from(offset)
            .ok()
            .filter(|&o| o != u32::MAX)
            .map(Self::new)
    }

    /// Reinterprets the offset as pointing at a different type.
    pub const fn cast<U>(self) -> OffsetRef<U> {
        OffsetRef::new(self.offset)
    }
}

impl<T> Clone for OffsetRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OffsetRef<T> {}

impl<T> PartialEq for OffsetRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T> Eq for OffsetRef<T> {}

impl<T> Hash for OffsetRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.hash(state);
    }
}

impl<T> Default for OffsetRef<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> fmt::Debug for OffsetRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "OffsetRef(null)")
        } else {
            write!(f, "OffsetRef({:#x})", self.offset)
        }
    }
}

/// Offset of a NUL-terminated UTF-8 string inside an arena.
///
/// Strings carry no stored length; readers scan to the terminator written by
/// [`ArenaStore::create_string`](crate::ArenaStore::create_string).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct StringRef(OffsetRef<u8>);

impl StringRef {
    /// The null string.
    pub const NULL: Self = Self(OffsetRef::NULL);

    /// Wraps the offset of the string's first byte.
    pub const fn new(bytes: OffsetRef<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the offset of the string's first byte.
    pub const fn bytes(self) -> OffsetRef<u8> {
        self.0
    }

    /// Returns `true` for the null string.
    pub const fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for StringRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringRef({:?})", self.0)
    }
}
