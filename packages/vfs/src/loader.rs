//! Archive staging into the store.
//!
//! The loader decodes packed archives and inserts every entry under a fixed
//! mount root, creating parent directories as needed. If the same path
//! appears in more than one archive, the entry from the archive loaded later
//! wins — last-write-wins, no merge. Any transport or decode failure aborts
//! the load; the caller must not start the toolchain afterwards.

use std::collections::BTreeMap;

use tracing::debug;

use toolhost_archive::{decode, ArchiveMap};

use crate::error::{LoadError, TransportError, VfsError};
use crate::path;
use crate::store::VfsStore;

/// Where the loader stages each archive family.
#[derive(Debug, Clone)]
pub struct MountLayout {
    /// Root of the packaged standard-library tree and include files.
    pub namespace_root: String,
    /// Directory holding one prebuilt binary per tool name.
    pub tool_dir: String,
    /// Root of the build cache; shard entries land directly under it.
    pub cache_root: String,
    /// Tool names that must exist as entries even when no archive ships a
    /// binary for them; missing ones get zero-length placeholders.
    pub required_tools: Vec<String>,
}

impl Default for MountLayout {
    fn default() -> Self {
        Self {
            namespace_root: "/go".to_string(),
            tool_dir: "/go/pkg/tool/sandbox".to_string(),
            cache_root: "/var/cache".to_string(),
            required_tools: ["asm", "buildid", "compile", "link", "pack"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// A source of archive bytes, addressed by name.
///
/// The loader never cares where bytes come from; production uses an HTTP
/// source, tests use [`MapSource`]. A fetch failure is a [`TransportError`]
/// and aborts the load.
pub trait ArchiveSource {
    fn fetch(&mut self, name: &str) -> Result<Vec<u8>, TransportError>;
}

/// An in-memory archive source.
#[derive(Debug, Default)]
pub struct MapSource {
    archives: BTreeMap<String, Vec<u8>>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an archive's encoded bytes under a name.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.archives.insert(name.into(), bytes);
    }
}

impl ArchiveSource for MapSource {
    fn fetch(&mut self, name: &str) -> Result<Vec<u8>, TransportError> {
        self.archives
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::new(name, "no such archive"))
    }
}

/// Seed the fixed base namespace.
///
/// Creates the well-known directories the toolchain expects before any
/// archive is staged: `/tmp`, `/dev` (with an empty `/dev/null`), the home
/// directory, the namespace root, the tool directory, and the cache root
/// with one subdirectory per hexadecimal digit.
pub fn base_layout(store: &mut VfsStore, layout: &MountLayout) -> Result<(), VfsError> {
    store.mkdir_all("/tmp")?;
    store.mkdir_all("/dev")?;
    store.write_file("/dev/null", &b""[..])?;
    store.mkdir_all("/root")?;
    store.mkdir_all(&layout.namespace_root)?;
    store.mkdir_all(&layout.tool_dir)?;
    store.mkdir_all(&layout.cache_root)?;
    for digit in "0123456789abcdef".chars() {
        store.mkdir_all(&path::join(&layout.cache_root, &digit.to_string()))?;
    }
    store.write_file(&path::join(&layout.cache_root, "README"), &b"Hi.\n"[..])?;
    Ok(())
}

/// Stages archives into a borrowed store.
pub struct Loader<'a> {
    store: &'a mut VfsStore,
    layout: MountLayout,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a mut VfsStore, layout: MountLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &MountLayout {
        &self.layout
    }

    /// Fetch and stage a standard-library archive under the namespace root.
    pub fn stage_stdlib(
        &mut self,
        source: &mut dyn ArchiveSource,
        name: &str,
    ) -> Result<(), LoadError> {
        let map = decode(&source.fetch(name)?)?;
        debug!(archive = name, entries = map.len(), "staging stdlib archive");
        let root = self.layout.namespace_root.clone();
        self.stage_entries(&root, map)
    }

    /// Fetch and stage the prebuilt tool binaries under the tool directory.
    ///
    /// Archive keys are tool names. Required tools the archive does not
    /// carry get zero-length placeholder entries, because the toolchain
    /// stats them before dispatch.
    pub fn stage_tools(
        &mut self,
        source: &mut dyn ArchiveSource,
        name: &str,
    ) -> Result<(), LoadError> {
        let map = decode(&source.fetch(name)?)?;
        debug!(archive = name, entries = map.len(), "staging tool archive");
        let tool_dir = self.layout.tool_dir.clone();
        let staged: Vec<String> = map.keys().cloned().collect();
        self.stage_entries(&tool_dir, map)?;
        for tool in self.layout.required_tools.clone() {
            if !staged.contains(&tool) {
                let placeholder = path::join(&tool_dir, &tool);
                if self.store.stat(&placeholder).is_none() {
                    self.store.write_file(&placeholder, &b""[..])?;
                }
            }
        }
        Ok(())
    }

    /// Fetch and stage one build-cache shard.
    ///
    /// Shards are named by the first hexadecimal character of their entries'
    /// cache keys and may be loaded lazily in any order; last-write-wins
    /// holds across shards.
    pub fn stage_cache_shard(
        &mut self,
        source: &mut dyn ArchiveSource,
        shard: char,
    ) -> Result<(), LoadError> {
        if !shard.is_ascii_hexdigit() || shard.is_ascii_uppercase() {
            return Err(LoadError::InvalidShard {
                name: shard.to_string(),
            });
        }
        let name = shard.to_string();
        let map = decode(&source.fetch(&name)?)?;
        debug!(shard = %shard, entries = map.len(), "staging cache shard");
        let root = self.layout.cache_root.clone();
        self.stage_entries(&root, map)
    }

    fn stage_entries(&mut self, root: &str, map: ArchiveMap) -> Result<(), LoadError> {
        for (key, content) in map {
            let full = path::join(root, &key);
            if let Some(parent) = path::parent(&full) {
                self.store.mkdir_all(&parent)?;
            }
            self.store.write_file(&full, content)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use toolhost_archive::{encode, ArchiveMap};

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut map = ArchiveMap::new();
        for (key, value) in entries {
            map.insert(key.to_string(), Bytes::copy_from_slice(value));
        }
        encode(&map).unwrap()
    }

    fn fresh() -> VfsStore {
        let mut store = VfsStore::new();
        base_layout(&mut store, &MountLayout::default()).unwrap();
        store
    }

    #[test]
    fn base_layout_seeds_namespace() {
        let store = fresh();
        assert!(store.stat("/tmp").unwrap().is_dir());
        assert!(!store.stat("/dev/null").unwrap().is_dir());
        assert!(store.stat("/go").unwrap().is_dir());
        assert!(store.stat("/go/pkg/tool/sandbox").unwrap().is_dir());
        assert!(store.stat("/var/cache/0").unwrap().is_dir());
        assert!(store.stat("/var/cache/f").unwrap().is_dir());
        assert!(store.stat("/var/cache/README").is_some());
    }

    #[test]
    fn stage_stdlib_creates_parents() {
        let mut store = fresh();
        let mut source = MapSource::new();
        source.insert("stdlib", archive(&[("src/os/file.x", b"content")]));

        let mut loader = Loader::new(&mut store, MountLayout::default());
        loader.stage_stdlib(&mut source, "stdlib").unwrap();

        assert!(store.stat("/go/src").unwrap().is_dir());
        assert!(store.stat("/go/src/os").unwrap().is_dir());
        assert_eq!(
            store.read_file("/go/src/os/file.x").unwrap(),
            Bytes::from_static(b"content")
        );
    }

    #[test]
    fn later_archive_wins() {
        let mut store = fresh();
        let mut source = MapSource::new();
        source.insert("base", archive(&[("src/a.x", b"old")]));
        source.insert("patch", archive(&[("src/a.x", b"new")]));

        let mut loader = Loader::new(&mut store, MountLayout::default());
        loader.stage_stdlib(&mut source, "base").unwrap();
        loader.stage_stdlib(&mut source, "patch").unwrap();

        assert_eq!(store.read_file("/go/src/a.x").unwrap(), Bytes::from_static(b"new"));
    }

    #[test]
    fn stage_tools_adds_placeholders() {
        let mut store = fresh();
        let mut source = MapSource::new();
        source.insert(
            "tools",
            archive(&[("asm", b"\0asm"), ("compile", b"\0compile"), ("link", b"\0link")]),
        );

        let mut loader = Loader::new(&mut store, MountLayout::default());
        loader.stage_tools(&mut source, "tools").unwrap();

        assert_eq!(
            store.read_file("/go/pkg/tool/sandbox/compile").unwrap(),
            Bytes::from_static(b"\0compile")
        );
        // Required but not shipped: zero-length placeholders.
        assert_eq!(store.read_file("/go/pkg/tool/sandbox/buildid").unwrap().len(), 0);
        assert_eq!(store.read_file("/go/pkg/tool/sandbox/pack").unwrap().len(), 0);
    }

    #[test]
    fn cache_shards_overlay_in_order() {
        let mut store = fresh();
        let mut source = MapSource::new();
        source.insert("a", archive(&[("a1b2/entry-d", b"first")]));

        Loader::new(&mut store, MountLayout::default())
            .stage_cache_shard(&mut source, 'a')
            .unwrap();
        assert_eq!(
            store.read_file("/var/cache/a1b2/entry-d").unwrap(),
            Bytes::from_static(b"first")
        );

        // A later snapshot of the same shard overlays the entry.
        source.insert("a", archive(&[("a1b2/entry-d", b"second")]));
        Loader::new(&mut store, MountLayout::default())
            .stage_cache_shard(&mut source, 'a')
            .unwrap();
        assert_eq!(
            store.read_file("/var/cache/a1b2/entry-d").unwrap(),
            Bytes::from_static(b"second")
        );
    }

    #[test]
    fn shard_name_must_be_hex_digit() {
        let mut store = fresh();
        let mut source = MapSource::new();
        let mut loader = Loader::new(&mut store, MountLayout::default());

        assert!(matches!(
            loader.stage_cache_shard(&mut source, 'g'),
            Err(LoadError::InvalidShard { .. })
        ));
        assert!(matches!(
            loader.stage_cache_shard(&mut source, 'A'),
            Err(LoadError::InvalidShard { .. })
        ));
    }

    #[test]
    fn missing_archive_is_transport_error() {
        let mut store = fresh();
        let mut source = MapSource::new();
        let mut loader = Loader::new(&mut store, MountLayout::default());

        let result = loader.stage_stdlib(&mut source, "stdlib");
        assert!(matches!(result, Err(LoadError::Transport(_))));
    }

    #[test]
    fn corrupt_archive_is_decode_error() {
        let mut store = fresh();
        let mut source = MapSource::new();
        source.insert("stdlib", b"definitely not gzip".to_vec());

        let mut loader = Loader::new(&mut store, MountLayout::default());
        let result = loader.stage_stdlib(&mut source, "stdlib");
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }
}
