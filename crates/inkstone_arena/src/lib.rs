//! File-backed, offset-addressed arena storage for compiled artifacts.
//!
//! An [`ArenaStore`] maps a file into memory and hands out space with a bump
//! allocator. Structures written into the arena link to each other through
//! [`OffsetRef`] values (byte offsets from the start of the file) instead of
//! pointers, so the file can be reopened read-only at any base address and
//! used immediately without deserialization.
//!
//! # Layout
//!
//! ```text
//! 0                          size                       capacity
//! ├──────── allocated ─────────┼──────── reserved ───────────┤
//! ```
//!
//! A writer allocates in `[size, capacity)` and calls
//! [`ArenaStore::shrink_to_fit`] once the build is complete. A reader opened
//! with [`ArenaStore::open_read_only`] treats the whole file as allocated.

#![warn(missing_docs)]

pub mod error;
pub mod offset;
pub mod store;

pub use error::ArenaError;
pub use offset::{ArenaValue, OffsetRef, StringRef};
pub use store::{ArenaStore, OpenMode, MAX_CAPACITY};
