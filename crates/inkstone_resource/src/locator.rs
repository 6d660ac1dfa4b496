//! Mapping resource ids to file paths and back.

use std::path::{Path, PathBuf};

use crate::kind::ResourceKind;

/// Anything that can turn a resource id into a concrete file path.
///
/// The build pipeline accepts either locator through this trait.
pub trait ResolvePath {
    /// Returns the path the resource should be read from.
    fn resolve_path(&self, resource_id: &str) -> PathBuf;

    /// Returns the naming convention used by this locator.
    fn kind(&self) -> &ResourceKind;
}

/// Resolves resource ids under a single root directory.
///
/// Resolution is pure string construction and never touches the filesystem.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    kind: ResourceKind,
    root_path: PathBuf,
}

impl ResourceLocator {
    /// Creates a locator for `kind` with an empty (current directory) root.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            root_path: PathBuf::new(),
        }
    }

    /// Sets the root directory resources are anchored under.
    pub fn with_root(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Replaces the root directory.
    pub fn set_root_path(&mut self, root_path: impl Into<PathBuf>) {
        self.root_path = root_path.into();
    }

    /// Returns the root directory.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Returns `root_path / (prefix + resource_id + suffix)`.
    pub fn resolve(&self, resource_id: &str) -> PathBuf {
        self.root_path.join(self.kind.file_name(resource_id))
    }

    /// Adds whichever of the prefix and suffix `resource_id` is missing.
    ///
    /// The prefix is only added to bare names; an id that already names a
    /// subdirectory (`"custom/foo"`) is left unprefixed.
    pub fn to_file_path(&self, resource_id: &str) -> String {
        let has_parent = Path::new(resource_id)
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty());
        let missing_prefix = !has_parent && !resource_id.starts_with(&self.kind.prefix);
        let missing_suffix = !resource_id.ends_with(&self.kind.suffix);
        format!(
            "{}{}{}",
            if missing_prefix { self.kind.prefix.as_str() } else { "" },
            resource_id,
            if missing_suffix { self.kind.suffix.as_str() } else { "" },
        )
    }

    /// Recovers the resource id from a file path.
    ///
    /// A path beneath the root directory is made relative to it first. The
    /// prefix and suffix are then stripped when present; a path matching
    /// neither is returned unchanged.
    pub fn to_resource_id(&self, file_path: &Path) -> String {
        self.strip_convention(relative_to(file_path, &self.root_path))
    }

    fn strip_convention(&self, path: &Path) -> String {
        let text = generic_string(path);
        let start = if text.starts_with(&self.kind.prefix) {
            self.kind.prefix.len()
        } else {
            0
        };
        let end = if text.ends_with(&self.kind.suffix) {
            text.len() - self.kind.suffix.len()
        } else {
            text.len()
        };
        if end < start {
            // Prefix and suffix overlap, e.g. a file named exactly like the suffix.
            return String::new();
        }
        text[start..end].to_string()
    }
}

impl ResolvePath for ResourceLocator {
    fn resolve_path(&self, resource_id: &str) -> PathBuf {
        self.resolve(resource_id)
    }

    fn kind(&self) -> &ResourceKind {
        &self.kind
    }
}

/// Resolves resource ids under a primary root, falling back to a shared root.
///
/// A file present under the primary root (typically the user's data
/// directory) shadows the same-named file under the fallback root (the
/// shared, read-only data directory).
#[derive(Debug, Clone)]
pub struct FallbackResourceLocator {
    primary: ResourceLocator,
    fallback_root_path: Option<PathBuf>,
}

impl FallbackResourceLocator {
    /// Creates a locator for `kind` with no fallback root.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            primary: ResourceLocator::new(kind),
            fallback_root_path: None,
        }
    }

    /// Sets the primary root directory.
    pub fn with_root(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.primary.set_root_path(root_path);
        self
    }

    /// Sets the fallback root directory.
    pub fn with_fallback_root(mut self, fallback_root_path: impl Into<PathBuf>) -> Self {
        self.fallback_root_path = Some(fallback_root_path.into());
        self
    }

    /// Replaces the fallback root directory.
    pub fn set_fallback_root_path(&mut self, fallback_root_path: Option<PathBuf>) {
        self.fallback_root_path = fallback_root_path;
    }

    /// Returns the primary root directory.
    pub fn root_path(&self) -> &Path {
        self.primary.root_path()
    }

    /// Returns the fallback root directory, if configured.
    pub fn fallback_root_path(&self) -> Option<&Path> {
        self.fallback_root_path.as_deref()
    }

    /// Returns the primary path if it exists, else the fallback path if that
    /// exists, else the (non-existent) primary path.
    pub fn resolve(&self, resource_id: &str) -> PathBuf {
        let default_path = self.primary.resolve(resource_id);
        if default_path.exists() {
            return default_path;
        }
        if let Some(fallback_root) = &self.fallback_root_path {
            let fallback_path = fallback_root.join(self.primary.kind.file_name(resource_id));
            if fallback_path.exists() {
                tracing::debug!(
                    resource_id,
                    path = %fallback_path.display(),
                    "resolved resource under fallback root"
                );
                return fallback_path;
            }
        }
        default_path
    }

    /// See [`ResourceLocator::to_file_path`].
    pub fn to_file_path(&self, resource_id: &str) -> String {
        self.primary.to_file_path(resource_id)
    }

    /// Recovers the resource id from a path under either root.
    pub fn to_resource_id(&self, file_path: &Path) -> String {
        let mut relative = relative_to(file_path, self.primary.root_path());
        if relative == file_path {
            if let Some(fallback_root) = &self.fallback_root_path {
                relative = relative_to(file_path, fallback_root);
            }
        }
        self.primary.strip_convention(relative)
    }
}

impl ResolvePath for FallbackResourceLocator {
    fn resolve_path(&self, resource_id: &str) -> PathBuf {
        self.resolve(resource_id)
    }

    fn kind(&self) -> &ResourceKind {
        &self.primary.kind
    }
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    if root.as_os_str().is_empty() {
        return path;
    }
    path.strip_prefix(root).unwrap_or(path)
}

/// Renders a path with `/` separators regardless of platform.
fn generic_string(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
