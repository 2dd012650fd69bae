//! The in-memory filesystem store.
//!
//! A flat ordered map of normalized absolute path to node. Directories are
//! explicit entries; a node's parent chain must exist (and be directories)
//! before the node itself is inserted. The store is populated once by the
//! loader and then serves as the system of record for the toolchain's reads
//! and writes for the rest of the process lifetime.

use std::collections::BTreeMap;
use std::ops::Bound;

use bytes::Bytes;

use crate::error::VfsError;
use crate::path;

/// A single entry in the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A directory; children are separate entries under its path.
    Directory,
    /// A regular file and its content.
    File(Bytes),
}

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Stat result for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub kind: NodeKind,
    /// Content length for files, zero for directories.
    pub size: usize,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// The in-memory hierarchical namespace.
#[derive(Debug, Default)]
pub struct VfsStore {
    nodes: BTreeMap<String, Node>,
}

impl VfsStore {
    /// Create a store containing only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Directory);
        Self { nodes }
    }

    /// Stat an entry; `None` if the path names nothing.
    pub fn stat(&self, path: &str) -> Option<Metadata> {
        let path = Self::canonical(path).ok()?;
        self.nodes.get(&path).map(|node| match node {
            Node::Directory => Metadata {
                kind: NodeKind::Directory,
                size: 0,
            },
            Node::File(content) => Metadata {
                kind: NodeKind::File,
                size: content.len(),
            },
        })
    }

    /// Read a file's content.
    pub fn read_file(&self, path: &str) -> Result<Bytes, VfsError> {
        let path = Self::canonical(path)?;
        match self.nodes.get(&path) {
            Some(Node::File(content)) => Ok(content.clone()),
            Some(Node::Directory) => Err(VfsError::IsDirectory { path }),
            None => Err(VfsError::NotFound { path }),
        }
    }

    /// Create or overwrite a file.
    ///
    /// The parent chain must already exist as directories; the loader (and
    /// only the loader) creates parents implicitly via [`mkdir_all`].
    ///
    /// [`mkdir_all`]: VfsStore::mkdir_all
    pub fn write_file(&mut self, path: &str, content: impl Into<Bytes>) -> Result<(), VfsError> {
        let path = Self::canonical(path)?;
        if let Some(Node::Directory) = self.nodes.get(&path) {
            return Err(VfsError::IsDirectory { path });
        }
        if let Some(parent) = path::parent(&path) {
            match self.nodes.get(&parent) {
                Some(Node::Directory) => {}
                Some(Node::File(_)) => return Err(VfsError::NotADirectory { path: parent }),
                None => return Err(VfsError::NotFound { path: parent }),
            }
        }
        self.nodes.insert(path, Node::File(content.into()));
        Ok(())
    }

    /// Create a directory and any missing ancestors.
    ///
    /// A file anywhere in the chain is an error and nothing past it is
    /// created.
    pub fn mkdir_all(&mut self, path: &str) -> Result<(), VfsError> {
        let path = Self::canonical(path)?;
        for ancestor in path::ancestors(&path) {
            match self.nodes.get(&ancestor) {
                Some(Node::Directory) => {}
                Some(Node::File(_)) => return Err(VfsError::AlreadyExists { path: ancestor }),
                None => {
                    self.nodes.insert(ancestor, Node::Directory);
                }
            }
        }
        Ok(())
    }

    /// Remove a file.
    pub fn remove_file(&mut self, path: &str) -> Result<(), VfsError> {
        let path = Self::canonical(path)?;
        match self.nodes.get(&path) {
            Some(Node::File(_)) => {
                self.nodes.remove(&path);
                Ok(())
            }
            Some(Node::Directory) => Err(VfsError::IsDirectory { path }),
            None => Err(VfsError::NotFound { path }),
        }
    }

    /// Remove an empty directory.
    pub fn remove_dir(&mut self, path: &str) -> Result<(), VfsError> {
        let path = Self::canonical(path)?;
        match self.nodes.get(&path) {
            Some(Node::Directory) => {
                if self.has_children(&path) {
                    return Err(VfsError::NotEmpty { path });
                }
                self.nodes.remove(&path);
                Ok(())
            }
            Some(Node::File(_)) => Err(VfsError::NotADirectory { path }),
            None => Err(VfsError::NotFound { path }),
        }
    }

    /// Names of a directory's immediate children, in order.
    pub fn child_names(&self, dir: &str) -> Result<Vec<String>, VfsError> {
        let dir = Self::canonical(dir)?;
        match self.nodes.get(&dir) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => return Err(VfsError::NotADirectory { path: dir }),
            None => return Err(VfsError::NotFound { path: dir }),
        }
        let prefix = if dir == "/" { "/".to_string() } else { format!("{}/", dir) };
        let mut names = Vec::new();
        for (key, _) in self
            .nodes
            .range::<str, _>((Bound::Excluded(prefix.as_str()), Bound::Unbounded))
        {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            if !rest.contains('/') {
                names.push(rest.to_string());
            }
        }
        Ok(names)
    }

    /// Number of entries, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = if dir == "/" { "/".to_string() } else { format!("{}/", dir) };
        self.nodes
            .range::<str, _>((Bound::Excluded(prefix.as_str()), Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    fn canonical(path: &str) -> Result<String, VfsError> {
        if !path.starts_with('/') {
            return Err(VfsError::NotAbsolute {
                path: path.to_string(),
            });
        }
        Ok(path::clean(path))
    }
}
