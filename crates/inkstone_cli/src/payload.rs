//! The string-table payload the CLI compiles resources into.
//!
//! Each source resource becomes one `(id, text)` entry. The table is an
//! arena-resident array of [`TableEntry`] rooted at a [`StringTable`].

use inkstone_arena::{ArenaStore, OffsetRef, StringRef};
use inkstone_build::{Artifact, BuildError, SourceResource};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Payload kind tag for string tables.
pub const STRING_TABLE_KIND: u32 = 1;

/// One compiled resource.
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct TableEntry {
    /// Resource id.
    pub id: StringRef,
    /// Resource contents.
    pub text: StringRef,
}

/// Payload root.
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct StringTable {
    /// First entry, or null for an empty table.
    pub entries: OffsetRef<TableEntry>,
    /// Number of entries.
    pub len: u32,
}

/// Reads the contents of each resource.
///
/// A resource whose file cannot be read as text without NULs is marked not
/// loaded and contributes no entry, so its stamp forces a rebuild next time.
pub fn load_sources(resources: &mut [SourceResource]) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for resource in resources.iter_mut() {
        let Some(path) = resource.path.as_deref().filter(|_| resource.loaded) else {
            continue;
        };
        match std::fs::read_to_string(path) {
            Ok(text) if !text.contains('\0') => entries.push((resource.id.clone(), text)),
            Ok(_) => {
                tracing::warn!(resource = %resource.id, "source contains NUL bytes, skipping");
                resource.loaded = false;
            }
            Err(e) => {
                tracing::warn!(resource = %resource.id, error = %e, "failed to read source");
                resource.loaded = false;
            }
        }
    }
    entries
}

/// Writes `entries` as a string table and returns its root.
pub fn write_string_table(
    store: &mut ArenaStore,
    entries: &[(String, String)],
) -> Result<OffsetRef<StringTable>, BuildError> {
    let mut table = Vec::with_capacity(entries.len());
    for (id, text) in entries {
        table.push(TableEntry {
            id: store.create_string(id)?,
            text: store.create_string(text)?,
        });
    }
    let first = if table.is_empty() {
        OffsetRef::NULL
    } else {
        store.allocate_slice(&table)?
    };
    let len = u32::try_from(table.len()).map_err(|_| BuildError::Serialization {
        reason: format!("{} entries exceed the table limit", table.len()),
    })?;
    Ok(store.push(StringTable {
        entries: first,
        len,
    })?)
}

/// Reads the string table back out of an artifact.
pub fn read_string_table(artifact: &Artifact) -> Result<Vec<(String, String)>, BuildError> {
    let store = artifact.store();
    let root = store.get(artifact.payload_root::<StringTable>())?;
    if root.len == 0 {
        return Ok(Vec::new());
    }
    let entries = store.get_slice(root.entries, root.len as usize)?;
    entries
        .iter()
        .map(|e| -> Result<(String, String), BuildError> {
            Ok((
                store.get_str(e.id)?.to_string(),
                store.get_str(e.text)?.to_string(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkstone_build::{ArtifactBuilder, ArtifactMetadata};

    fn build(dir: &std::path::Path, entries: &[(String, String)]) -> Artifact {
        let path = dir.join("table.bin");
        ArtifactBuilder::new()
            .with_initial_capacity(128)
            .with_payload_kind(STRING_TABLE_KIND)
            .build(&path, &ArtifactMetadata::default(), |store| {
                write_string_table(store, entries)
            })
            .unwrap();
        Artifact::open(&path).unwrap()
    }

    #[test]
    fn table_round_trips_through_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            ("luna".to_string(), "月 yue\n".to_string()),
            ("essay".to_string(), "的 de 1000\n".to_string()),
        ];
        let artifact = build(dir.path(), &entries);
        assert_eq!(artifact.header().payload_kind(), STRING_TABLE_KIND);
        assert_eq!(read_string_table(&artifact).unwrap(), entries);
    }

    #[test]
    fn empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = build(dir.path(), &[]);
        assert!(read_string_table(&artifact).unwrap().is_empty());
    }

    #[test]
    fn unreadable_sources_are_marked_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        let nul = dir.path().join("nul.txt");
        std::fs::write(&good, "text").unwrap();
        std::fs::write(&nul, b"a\0b").unwrap();

        let mut resources = vec![
            SourceResource::new("good", &good),
            SourceResource::new("nul", &nul),
            SourceResource::new("gone", dir.path().join("gone.txt")),
            SourceResource::unpersisted("memory"),
        ];
        let entries = load_sources(&mut resources);

        assert_eq!(entries, vec![("good".to_string(), "text".to_string())]);
        assert!(resources[0].loaded);
        assert!(!resources[1].loaded);
        assert!(!resources[2].loaded);
        assert!(resources[3].loaded);
    }
}
