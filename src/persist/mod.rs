//! Package persistence
//!
//! Materializes node trees into a real filesystem directory and reconstructs
//! them, either wholesale or differentially against per-node dirty state.
//! All file access goes through the narrow [`FileIo`] seam so hosts can
//! substitute their own storage.

pub mod fs;

use crate::codec::Codecs;
use crate::error::Error;
use crate::tree::node::{BodyRef, Node};
use indexmap::IndexMap;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// One directory-listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
}

/// Blocking file-I/O collaborator.
///
/// Every call runs to completion before returning. Methods return plain
/// `io::Result`; the engine attaches path context when wrapping failures
/// into [`Error`].
pub trait FileIo {
    fn exists(&self, path: &Path) -> bool;
    fn is_directory(&self, path: &Path) -> bool;
    /// Immediate entries of a directory, in a deterministic order.
    fn list_entries(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    /// Create a directory and any missing parents; succeeds if present.
    fn create_directory(&self, path: &Path) -> io::Result<()>;
    /// Delete a file or a directory subtree.
    fn delete_entry(&self, path: &Path) -> io::Result<()>;
}

/// Load/write engine binding a file-I/O adapter to a codec bundle.
pub struct PackageIo<F = fs::StdFs> {
    fs: F,
    codecs: Codecs,
}

impl PackageIo<fs::StdFs> {
    /// Engine over the standard filesystem with the default codecs.
    pub fn new() -> Self {
        PackageIo {
            fs: fs::StdFs,
            codecs: Codecs::default(),
        }
    }
}

impl Default for PackageIo<fs::StdFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileIo> PackageIo<F> {
    pub fn with(fs: F, codecs: Codecs) -> Self {
        PackageIo { fs, codecs }
    }

    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    /// Load a node tree from `path`.
    ///
    /// `expect_directory` is only the caller's expectation; the constructed
    /// node always reflects the real entry kind, discovered from the
    /// filesystem. Fails with [`Error::NotFound`] when the target is absent.
    pub fn load(&self, path: &Path, expect_directory: bool) -> Result<Node, Error> {
        if !self.fs.exists(path) {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }
        let is_directory = self.fs.is_directory(path);
        if is_directory != expect_directory {
            warn!(
                path = %path.display(),
                is_directory,
                "entry kind differs from caller hint"
            );
        }
        self.load_node(path, is_directory)
    }

    fn load_node(&self, path: &Path, is_directory: bool) -> Result<Node, Error> {
        if is_directory {
            debug!(path = %path.display(), "loading directory");
            let mut children = IndexMap::new();
            for entry in self.list_entries(path)? {
                let child_path = path.join(&entry.name);
                let mut child = self.load_node(&child_path, entry.is_directory)?;
                child.assign_filename(entry.name.clone());
                children.insert(entry.name, child);
            }
            Ok(Node::loaded_directory(children))
        } else {
            let bytes = self
                .fs
                .read_bytes(path)
                .map_err(|source| io_error(path, source))?;
            Ok(Node::loaded_leaf(bytes))
        }
    }

    /// Write the whole tree beneath `path` — a full, idempotent overwrite.
    ///
    /// Leaves re-encode their canonical content through the codecs and
    /// replace any existing entry; directories are created if absent and
    /// recurse into every child. Every node in the written subtree becomes
    /// clean. Failures propagate unretried; an interrupted write may leave
    /// some children written and others not.
    pub fn write(&self, node: &mut Node, path: &Path) -> Result<(), Error> {
        self.write_node(node, path)
    }

    /// Write only the modifications since the tree was loaded or last
    /// written. The target must already exist on disk matching the tree's
    /// prior clean state.
    ///
    /// Clean leaves perform no I/O. A dirty directory first reconciles the
    /// on-disk listing, deleting entries that no longer appear among its
    /// children; clean or dirty, it then recurses into every current child,
    /// full-writing those with no (or a kind-mismatched) on-disk
    /// counterpart. Every visited node becomes clean.
    pub fn write_updates(&self, node: &mut Node, path: &Path) -> Result<(), Error> {
        self.write_updates_node(node, path)
    }

    fn write_node(&self, node: &mut Node, path: &Path) -> Result<(), Error> {
        match node.body_for_persist() {
            BodyRef::Leaf(cell) => {
                let bytes = cell.encoded(&self.codecs).map_err(|source| Error::Encode {
                    path: path.to_path_buf(),
                    source,
                })?;
                if self.fs.is_directory(path) {
                    // A directory occupies the leaf's name; replace it.
                    self.fs
                        .delete_entry(path)
                        .map_err(|source| io_error(path, source))?;
                }
                self.fs
                    .write_bytes(path, &bytes)
                    .map_err(|source| io_error(path, source))?;
            }
            BodyRef::Directory(children) => {
                if self.fs.exists(path) && !self.fs.is_directory(path) {
                    self.fs
                        .delete_entry(path)
                        .map_err(|source| io_error(path, source))?;
                }
                self.fs
                    .create_directory(path)
                    .map_err(|source| io_error(path, source))?;
                for (name, child) in children.iter_mut() {
                    self.write_node(child, &path.join(name))?;
                }
            }
        }
        node.mark_clean();
        Ok(())
    }

    fn write_updates_node(&self, node: &mut Node, path: &Path) -> Result<(), Error> {
        let dirty = node.is_dirty();
        match node.body_for_persist() {
            BodyRef::Leaf(cell) => {
                if dirty {
                    let bytes = cell.encoded(&self.codecs).map_err(|source| Error::Encode {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    self.fs
                        .write_bytes(path, &bytes)
                        .map_err(|source| io_error(path, source))?;
                }
            }
            BodyRef::Directory(children) => {
                if dirty {
                    // The child set changed at this level: delete on-disk
                    // entries whose name is no longer among the children.
                    for entry in self.list_entries(path)? {
                        if !children.contains_key(&entry.name) {
                            debug!(name = %entry.name, "reconciling removed child");
                            let stale = path.join(&entry.name);
                            self.fs
                                .delete_entry(&stale)
                                .map_err(|source| io_error(&stale, source))?;
                        }
                    }
                }
                for (name, child) in children.iter_mut() {
                    let child_path = path.join(name);
                    let counterpart_matches = self.fs.exists(&child_path)
                        && self.fs.is_directory(&child_path) == child.is_directory();
                    if counterpart_matches {
                        self.write_updates_node(child, &child_path)?;
                    } else {
                        // Freshly added (or kind-swapped) children have no
                        // prior on-disk state to diff against.
                        self.write_node(child, &child_path)?;
                    }
                }
            }
        }
        node.mark_clean();
        Ok(())
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<DirEntry>, Error> {
        self.fs
            .list_entries(path)
            .map_err(|source| io_error(path, source))
    }
}

fn io_error(path: &Path, source: io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    /// In-memory [`FileIo`] that records every mutating call.
    #[derive(Default)]
    struct MemFs {
        files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
        directories: RefCell<Vec<PathBuf>>,
        written: RefCell<Vec<PathBuf>>,
        deleted: RefCell<Vec<PathBuf>>,
    }

    impl MemFs {
        fn written_names(&self) -> Vec<String> {
            self.written
                .borrow()
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect()
        }

        fn clear_log(&self) {
            self.written.borrow_mut().clear();
            self.deleted.borrow_mut().clear();
        }
    }

    impl FileIo for MemFs {
        fn exists(&self, path: &Path) -> bool {
            self.files.borrow().contains_key(path) || self.is_directory(path)
        }

        fn is_directory(&self, path: &Path) -> bool {
            self.directories.borrow().iter().any(|d| d == path)
        }

        fn list_entries(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
            let mut entries = Vec::new();
            for file in self.files.borrow().keys() {
                if file.parent() == Some(path) {
                    entries.push(DirEntry {
                        name: file.file_name().unwrap().to_string_lossy().into_owned(),
                        is_directory: false,
                    });
                }
            }
            for dir in self.directories.borrow().iter() {
                if dir.parent() == Some(path) {
                    entries.push(DirEntry {
                        name: dir.file_name().unwrap().to_string_lossy().into_owned(),
                        is_directory: true,
                    });
                }
            }
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(entries)
        }

        fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }

        fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
            self.files.borrow_mut().insert(path.to_path_buf(), bytes.to_vec());
            self.written.borrow_mut().push(path.to_path_buf());
            Ok(())
        }

        fn create_directory(&self, path: &Path) -> io::Result<()> {
            if !self.is_directory(path) {
                self.directories.borrow_mut().push(path.to_path_buf());
            }
            Ok(())
        }

        fn delete_entry(&self, path: &Path) -> io::Result<()> {
            self.files
                .borrow_mut()
                .retain(|p, _| !p.starts_with(path));
            self.directories.borrow_mut().retain(|d| !d.starts_with(path));
            self.deleted.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn engine() -> PackageIo<MemFs> {
        PackageIo::with(MemFs::default(), Codecs::default())
    }

    fn sample_tree() -> Node {
        let mut root = Node::new_directory();
        root.add_content(Content::Text("hello".to_string()), "a.txt");
        root.add_content(Content::Bytes(vec![1, 2, 3]), "blob.bin");
        let mut sub = Node::new_directory();
        sub.add_content(Content::Text("nested".to_string()), "inner.txt");
        root.add(sub, "sub");
        root
    }

    #[test]
    fn test_load_missing_target_is_not_found() {
        let io = engine();
        let err = io.load(Path::new("/pkg"), true).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_write_then_load_round_trips() {
        let io = engine();
        let mut root = sample_tree();
        io.write(&mut root, Path::new("/pkg")).unwrap();
        assert!(!root.is_dirty());

        let mut loaded = io.load(Path::new("/pkg"), true).unwrap();
        assert!(loaded.is_directory());
        assert!(!loaded.is_dirty());
        assert_eq!(
            loaded.wrapper_mut("a.txt").and_then(|n| n.as_text()),
            Some("hello")
        );
        assert_eq!(
            loaded.wrapper("blob.bin").and_then(Node::as_bytes),
            Some([1, 2, 3].as_slice())
        );
        assert_eq!(
            loaded.wrapper_mut("sub/inner.txt").and_then(|n| n.as_text()),
            Some("nested")
        );
    }

    #[test]
    fn test_load_ignores_wrong_hint() {
        let io = engine();
        let mut root = sample_tree();
        io.write(&mut root, Path::new("/pkg")).unwrap();

        let loaded = io.load(Path::new("/pkg"), false).unwrap();
        assert!(loaded.is_directory());
    }

    #[test]
    fn test_write_updates_skips_clean_leaves() {
        let io = engine();
        let mut root = sample_tree();
        io.write(&mut root, Path::new("/pkg")).unwrap();
        io.fs.clear_log();

        io.write_updates(&mut root, Path::new("/pkg")).unwrap();
        assert!(io.fs.written_names().is_empty());
        assert!(io.fs.deleted.borrow().is_empty());
    }

    #[test]
    fn test_write_updates_rewrites_only_dirty_leaf() {
        let io = engine();
        let mut root = sample_tree();
        io.write(&mut root, Path::new("/pkg")).unwrap();
        io.fs.clear_log();

        root.wrapper_mut("sub/inner.txt")
            .expect("leaf exists")
            .update(Content::Text("changed".to_string()));
        io.write_updates(&mut root, Path::new("/pkg")).unwrap();

        assert_eq!(io.fs.written_names(), vec!["inner.txt".to_string()]);
        assert!(!root.wrapper("sub/inner.txt").expect("leaf").is_dirty());
    }

    #[test]
    fn test_write_updates_reconciles_removed_children() {
        let io = engine();
        let mut root = sample_tree();
        io.write(&mut root, Path::new("/pkg")).unwrap();
        io.fs.clear_log();

        root.remove_child("blob.bin");
        io.write_updates(&mut root, Path::new("/pkg")).unwrap();

        assert_eq!(io.fs.deleted.borrow().as_slice(), [PathBuf::from("/pkg/blob.bin")]);
        assert!(io.fs.written_names().is_empty());
        assert!(!io.fs.exists(Path::new("/pkg/blob.bin")));
    }

    #[test]
    fn test_write_updates_full_writes_fresh_children() {
        let io = engine();
        let mut root = sample_tree();
        io.write(&mut root, Path::new("/pkg")).unwrap();
        io.fs.clear_log();

        let mut extra = Node::new_directory();
        extra.add_content(Content::Text("new".to_string()), "fresh.txt");
        root.add(extra, "extra");
        io.write_updates(&mut root, Path::new("/pkg")).unwrap();

        assert_eq!(io.fs.written_names(), vec!["fresh.txt".to_string()]);
        assert!(io.fs.is_directory(Path::new("/pkg/extra")));
    }

    #[test]
    fn test_write_replaces_kind_mismatched_entries() {
        let io = engine();
        let mut root = sample_tree();
        io.write(&mut root, Path::new("/pkg")).unwrap();

        // Same name, leaf -> directory.
        root.remove_child("a.txt");
        let mut replacement = Node::new_directory();
        replacement.add_content(Content::Text("below".to_string()), "b.txt");
        root.set(replacement, "a.txt");

        io.write_updates(&mut root, Path::new("/pkg")).unwrap();
        assert!(io.fs.is_directory(Path::new("/pkg/a.txt")));
        assert_eq!(
            io.fs.read_bytes(Path::new("/pkg/a.txt/b.txt")).unwrap(),
            b"below".to_vec()
        );
    }

    #[test]
    fn test_write_encodes_typed_content() {
        let io = engine();
        let mut root = Node::new_directory();
        let mut record = crate::codec::Record::new();
        record.insert(
            "name".to_string(),
            crate::codec::Value::Text("pack".to_string()),
        );
        root.add_content(Content::Record(record.clone()), "meta.json");

        io.write(&mut root, Path::new("/pkg")).unwrap();
        let bytes = io.fs.read_bytes(Path::new("/pkg/meta.json")).unwrap();
        assert_eq!(io.codecs().record.decode(&bytes).unwrap(), record);
    }
}
