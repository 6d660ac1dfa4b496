//! Resource location for dictionary and configuration sources.
//!
//! A [`ResourceKind`] declares a naming convention (`prefix + id + suffix`)
//! for one category of resource. A [`ResourceLocator`] anchors that convention
//! under a root directory, and a [`FallbackResourceLocator`] additionally looks
//! under a shared fallback root when the primary file does not exist.

#![warn(missing_docs)]

pub mod kind;
pub mod locator;

pub use kind::ResourceKind;
pub use locator::{FallbackResourceLocator, ResolvePath, ResourceLocator};
