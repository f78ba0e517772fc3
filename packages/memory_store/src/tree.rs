//! The namespace: a trie of directories and files keyed by path segment.
//!
//! Directories are pure containers. Every operation that can leave a
//! directory without children prunes it on the way back up, so apart from
//! the root an empty directory never exists.

use std::collections::BTreeMap;

use bytes::Bytes;
use vfiles_core_store::{Error, FileInfo, FilePath, Result};

/// A committed file. Content never changes after commit; a new write
/// replaces the whole node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub data: Bytes,
    pub mime_type: &'static str,
    /// Commit time in milliseconds since the Unix epoch.
    pub last_modified: i64,
}

impl FileNode {
    pub fn new(data: Bytes, mime_type: &'static str, last_modified: i64) -> Self {
        FileNode {
            data,
            mime_type,
            last_modified,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(FileNode),
    Directory(Directory),
}

/// Borrowed view of whatever a path resolves to, including the root.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    File(&'a FileNode),
    Directory(&'a Directory),
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::File(file) => NodeRef::File(file),
            Node::Directory(dir) => NodeRef::Directory(dir),
        }
    }
}

impl NodeRef<'_> {
    /// Metadata for this node as found at `path`.
    pub fn info(&self, path: FilePath) -> FileInfo {
        match self {
            NodeRef::File(file) => {
                FileInfo::file(path, file.size(), file.mime_type, file.last_modified)
            }
            NodeRef::Directory(_) => FileInfo::directory(path),
        }
    }
}

/// A directory; the root of the namespace is one too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    children: BTreeMap<String, Node>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Walk `path` from this directory. Returns `None` when a segment is
    /// missing or when the walk would have to descend into a file.
    pub fn resolve(&self, path: &FilePath) -> Option<NodeRef<'_>> {
        let mut current = NodeRef::Directory(self);
        for segment in path.segments() {
            let NodeRef::Directory(dir) = current else {
                return None;
            };
            current = NodeRef::from(dir.children.get(segment)?);
        }
        Some(current)
    }

    /// Walk `dir`, creating missing directories.
    ///
    /// Fails with `NotADirectory` when a segment already exists as a file.
    /// Nothing is created in that case: once a segment is missing, every
    /// segment after it is new.
    pub fn ensure_directory_path(&mut self, dir: &FilePath) -> Result<&mut Directory> {
        let mut current = self;
        for (depth, segment) in dir.segments().iter().enumerate() {
            let node = current
                .children
                .entry(segment.clone())
                .or_insert_with(|| Node::Directory(Directory::new()));
            current = match node {
                Node::Directory(child) => child,
                Node::File(_) => {
                    return Err(Error::NotADirectory {
                        path: dir.slice(0, depth + 1),
                    })
                }
            };
        }
        Ok(current)
    }

    /// Check that a file could be committed at `path` without changing
    /// anything.
    pub fn check_file_slot(&self, path: &FilePath) -> Result<()> {
        if path.is_root() {
            return Err(Error::invalid_path(path, "the root is always a directory"));
        }

        let last = path.len() - 1;
        let mut current = self;
        for (depth, segment) in path.segments().iter().enumerate() {
            match current.children.get(segment) {
                None => return Ok(()),
                Some(Node::File(_)) if depth == last => return Ok(()),
                Some(Node::File(_)) => {
                    return Err(Error::NotADirectory {
                        path: path.slice(0, depth + 1),
                    })
                }
                Some(Node::Directory(dir)) if depth == last => {
                    return if dir.is_empty() {
                        Ok(())
                    } else {
                        Err(Error::NotADirectory { path: path.clone() })
                    };
                }
                Some(Node::Directory(dir)) => current = dir,
            }
        }
        Ok(())
    }

    /// Insert or replace the file at `path`, creating parent directories.
    /// Returns the replaced file, if there was one.
    pub fn put_file(&mut self, path: &FilePath, file: FileNode) -> Result<Option<FileNode>> {
        self.check_file_slot(path)?;
        self.attach(path, Node::File(file))
            .map(|previous| match previous {
                Some(Node::File(previous)) => Some(previous),
                _ => None,
            })
    }

    /// Detach the node at `path` and prune ancestors left empty.
    ///
    /// The root itself is never detached: removing it clears its children
    /// and returns them as a directory. Missing paths return `None`.
    pub fn remove_subtree(&mut self, path: &FilePath) -> Option<Node> {
        if path.is_root() {
            let children = std::mem::take(&mut self.children);
            return if children.is_empty() {
                None
            } else {
                Some(Node::Directory(Directory { children }))
            };
        }
        self.detach(path.segments())
    }

    /// Relocate the node at `from` to `to`, keeping everything beneath it.
    ///
    /// Every check runs before the tree is touched, so a failed move leaves
    /// the tree as it was.
    pub fn move_subtree(&mut self, from: &FilePath, to: &FilePath) -> Result<()> {
        if from.is_root() {
            return Err(Error::invalid_path(from, "the root cannot be moved"));
        }
        let source_is_file = match self.resolve(from) {
            Some(NodeRef::File(_)) => true,
            Some(NodeRef::Directory(_)) => false,
            None => return Err(Error::NotFound { path: from.clone() }),
        };
        if from == to {
            return Ok(());
        }
        if to.starts_with(from) {
            return Err(Error::invalid_path(
                to,
                format!("cannot move {} inside itself", from),
            ));
        }

        match self.resolve(to) {
            Some(NodeRef::Directory(_)) => {
                return Err(Error::invalid_path(to, "destination is a directory"));
            }
            Some(NodeRef::File(_)) if !source_is_file => {
                return Err(Error::invalid_path(
                    to,
                    "cannot replace a file with a directory",
                ));
            }
            _ => {}
        }
        self.check_file_slot(to).map_err(|e| match e {
            Error::NotADirectory { path } => {
                Error::invalid_path(to, format!("parent {} is a file", path))
            }
            other => other,
        })?;

        // Detaching only removes the source subtree and directories it
        // leaves empty, so no file can appear above `to` in between.
        let node = self
            .detach(from.segments())
            .ok_or_else(|| Error::NotFound { path: from.clone() })?;
        self.attach(to, node)?;
        Ok(())
    }

    /// Metadata for every entry below this directory, pre-order, siblings
    /// in name order. `base` is the path of this directory.
    pub fn entries(&self, base: &FilePath, recursive: bool) -> Result<Vec<FileInfo>> {
        let mut out = Vec::new();
        self.collect_entries(base, recursive, &mut out)?;
        Ok(out)
    }

    fn collect_entries(
        &self,
        base: &FilePath,
        recursive: bool,
        out: &mut Vec<FileInfo>,
    ) -> Result<()> {
        for (name, child) in &self.children {
            let path = base.child(name)?;
            out.push(NodeRef::from(child).info(path.clone()));
            match child {
                Node::Directory(dir) if recursive => dir.collect_entries(&path, true, out)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn attach(&mut self, path: &FilePath, node: Node) -> Result<Option<Node>> {
        let Some((parent, name)) = path.split_last() else {
            return Err(Error::invalid_path(path, "the root cannot be replaced"));
        };
        let dir = self.ensure_directory_path(&parent)?;
        Ok(dir.children.insert(name.to_string(), node))
    }

    fn detach(&mut self, segments: &[String]) -> Option<Node> {
        let (first, rest) = segments.split_first()?;
        if rest.is_empty() {
            return self.children.remove(first);
        }

        let Some(Node::Directory(child)) = self.children.get_mut(first) else {
            return None;
        };
        let detached = child.detach(rest)?;
        if child.is_empty() {
            self.children.remove(first);
        }
        Some(detached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfiles_core_store::{file_path, FileKind};

    fn file(content: &'static str) -> FileNode {
        FileNode::new(Bytes::from_static(content.as_bytes()), "text/plain", 1)
    }

    fn paths(root: &Directory) -> Vec<String> {
        root.entries(&FilePath::root(), true)
            .unwrap()
            .into_iter()
            .map(|info| info.path.to_string())
            .collect()
    }

    #[test]
    fn new_tree_is_empty() {
        let root = Directory::new();
        assert!(root.is_empty());
        assert!(paths(&root).is_empty());
        assert!(matches!(
            root.resolve(&FilePath::root()),
            Some(NodeRef::Directory(_))
        ));
    }

    #[test]
    fn put_creates_parents() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b/c.txt"), file("hi")).unwrap();

        assert_eq!(paths(&root), vec!["/a", "/a/b", "/a/b/c.txt"]);
        assert!(matches!(
            root.resolve(&file_path!("/a/b")),
            Some(NodeRef::Directory(_))
        ));
        match root.resolve(&file_path!("/a/b/c.txt")) {
            Some(NodeRef::File(f)) => assert_eq!(&f.data[..], b"hi"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn put_returns_previous() {
        let mut root = Directory::new();
        assert_eq!(root.put_file(&file_path!("/a"), file("1")).unwrap(), None);
        assert_eq!(
            root.put_file(&file_path!("/a"), file("2")).unwrap(),
            Some(file("1"))
        );
    }

    #[test]
    fn resolve_does_not_descend_into_files() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a"), file("x")).unwrap();
        assert!(root.resolve(&file_path!("/a/b")).is_none());
        assert!(root.resolve(&file_path!("/missing")).is_none());
    }

    #[test]
    fn ensure_directory_path_stops_at_files() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/f"), file("x")).unwrap();
        let before = root.clone();

        match root.ensure_directory_path(&file_path!("/a/f/g/h")) {
            Err(Error::NotADirectory { path }) => assert_eq!(path, file_path!("/a/f")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(root, before);

        root.ensure_directory_path(&file_path!("/a/new")).unwrap();
        assert!(root.resolve(&file_path!("/a/new")).is_some());
    }

    #[test]
    fn put_over_populated_directory_fails() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b"), file("x")).unwrap();
        assert!(matches!(
            root.put_file(&file_path!("/a"), file("y")),
            Err(Error::NotADirectory { .. })
        ));
        assert!(matches!(
            root.put_file(&FilePath::root(), file("y")),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn remove_prunes_empty_ancestors() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b/c/d.txt"), file("x")).unwrap();
        root.put_file(&file_path!("/a/e.txt"), file("y")).unwrap();

        let removed = root.remove_subtree(&file_path!("/a/b/c/d.txt"));
        assert!(matches!(removed, Some(Node::File(_))));
        assert_eq!(paths(&root), vec!["/a", "/a/e.txt"]);

        root.remove_subtree(&file_path!("/a/e.txt"));
        assert!(root.is_empty());
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b"), file("x")).unwrap();
        let before = root.clone();
        assert!(root.remove_subtree(&file_path!("/a/c")).is_none());
        assert!(root.remove_subtree(&file_path!("/a/b/c")).is_none());
        assert_eq!(root, before);
    }

    #[test]
    fn remove_root_clears_children() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b"), file("x")).unwrap();
        root.put_file(&file_path!("/c"), file("y")).unwrap();

        match root.remove_subtree(&FilePath::root()) {
            Some(Node::Directory(old)) => assert_eq!(old.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(root.is_empty());
        assert!(root.remove_subtree(&FilePath::root()).is_none());
    }

    #[test]
    fn move_keeps_relative_structure() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b/c/message.txt"), file("m"))
            .unwrap();
        root.put_file(&file_path!("/a/top.txt"), file("t")).unwrap();

        root.move_subtree(&file_path!("/a"), &file_path!("/B")).unwrap();
        assert_eq!(
            paths(&root),
            vec!["/B", "/B/b", "/B/b/c", "/B/b/c/message.txt", "/B/top.txt"]
        );
    }

    #[test]
    fn move_keeps_file_metadata() {
        let mut root = Directory::new();
        let original = FileNode::new(Bytes::from_static(b"m"), "text/plain", 42);
        root.put_file(&file_path!("/a/m.txt"), original.clone())
            .unwrap();
        root.move_subtree(&file_path!("/a/m.txt"), &file_path!("/z/renamed.bin"))
            .unwrap();

        match root.resolve(&file_path!("/z/renamed.bin")) {
            Some(NodeRef::File(f)) => assert_eq!(f, &original),
            other => panic!("unexpected {other:?}"),
        }
        assert!(root.resolve(&file_path!("/a")).is_none());
    }

    #[test]
    fn move_rejections_leave_tree_unchanged() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b/c"), file("x")).unwrap();
        root.put_file(&file_path!("/f"), file("y")).unwrap();
        let before = root.clone();

        assert!(matches!(
            root.move_subtree(&file_path!("/nope"), &file_path!("/x")),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            root.move_subtree(&file_path!("/a"), &file_path!("/a/b/x")),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            root.move_subtree(&file_path!("/a/b/c"), &file_path!("/f/c")),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            root.move_subtree(&file_path!("/a"), &file_path!("/f")),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            root.move_subtree(&FilePath::root(), &file_path!("/x")),
            Err(Error::InvalidPath { .. })
        ));
        assert_eq!(root, before);
    }

    #[test]
    fn move_onto_itself_is_noop() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b"), file("x")).unwrap();
        let before = root.clone();
        root.move_subtree(&file_path!("/a"), &file_path!("/a")).unwrap();
        assert_eq!(root, before);
    }

    #[test]
    fn move_into_sibling_of_pruned_ancestor() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/a/b/only.txt"), file("x")).unwrap();
        root.move_subtree(&file_path!("/a/b/only.txt"), &file_path!("/a/only.txt"))
            .unwrap();
        assert_eq!(paths(&root), vec!["/a", "/a/only.txt"]);
    }

    #[test]
    fn shallow_entries() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/b/c"), file("x")).unwrap();
        root.put_file(&file_path!("/a"), file("yy")).unwrap();

        let infos = root.entries(&FilePath::root(), false).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].path, file_path!("/a"));
        assert_eq!(infos[0].kind, FileKind::File);
        assert_eq!(infos[0].size, Some(2));
        assert_eq!(infos[1].path, file_path!("/b"));
        assert_eq!(infos[1].kind, FileKind::Directory);
    }

    #[test]
    fn entries_of_subdirectory_use_full_paths() {
        let mut root = Directory::new();
        root.put_file(&file_path!("/x/y/z"), file("x")).unwrap();
        let Some(NodeRef::Directory(x)) = root.resolve(&file_path!("/x")) else {
            panic!("expected directory");
        };
        let infos = x.entries(&file_path!("/x"), true).unwrap();
        let got: Vec<String> = infos.iter().map(|i| i.path.to_string()).collect();
        assert_eq!(got, vec!["/x/y", "/x/y/z"]);
    }
}
