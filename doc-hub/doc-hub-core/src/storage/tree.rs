//! Plain filesystem backend.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;
use walkdir::WalkDir;

use super::Storage;
use crate::document::{base_id, join_path, parent_path, Document, ShortDocument};
use crate::error::{Result, StoreError};
use crate::slug::generate_id;

const CONTENT_EXT: &str = ".md";
const ROOT_KEY: &str = "root";

/// Document tree rooted at a `docs/` directory.
pub struct TreeStore {
    docs_dir: PathBuf,
    writes: Mutex<()>,
}

impl TreeStore {
    pub fn new(docs_dir: impl Into<PathBuf>) -> Result<Self> {
        let docs_dir = docs_dir.into();
        fs::create_dir_all(&docs_dir)?;
        Ok(Self {
            docs_dir,
            writes: Mutex::new(()),
        })
    }

    /// Directory holding the root nodes.
    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Validate a slash separated path and return it trimmed together with
    /// its directory. The empty path resolves to the docs directory itself.
    pub(crate) fn resolve(&self, path: &str) -> Result<(String, PathBuf)> {
        let trimmed = path.trim_matches('/');
        let mut dir = self.docs_dir.clone();
        if trimmed.is_empty() {
            return Ok((String::new(), dir));
        }
        for segment in trimmed.split('/') {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains('\\')
                || segment.contains('\0')
            {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            dir.push(segment);
        }
        Ok((trimmed.to_string(), dir))
    }

    /// Like [`resolve`](Self::resolve) but the path must name an existing node.
    pub(crate) fn resolve_node(&self, path: &str) -> Result<(String, PathBuf)> {
        let (path, dir) = self.resolve(path)?;
        if path.is_empty() || !dir.is_dir() {
            return Err(StoreError::NotFound(path));
        }
        Ok((path, dir))
    }

    /// Title of the node at `dir`, taken from its content file name.
    pub(crate) fn content_title(dir: &Path) -> Result<Option<String>> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(title) = name.to_str().and_then(|n| n.strip_suffix(CONTENT_EXT)) {
                return Ok(Some(title.to_string()));
            }
        }
        Ok(None)
    }

    pub(crate) fn title_of(&self, path: &str) -> Result<String> {
        let (path, dir) = self.resolve_node(path)?;
        Self::content_title(&dir)?.ok_or(StoreError::NotFound(path))
    }

    pub(crate) fn read_document(&self, path: &str) -> Result<Document> {
        let (path, dir) = self.resolve_node(path)?;
        let title = Self::content_title(&dir)?.ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let file = dir.join(format!("{title}{CONTENT_EXT}"));
        let content = fs::read_to_string(&file)?;
        let modified = fs::metadata(&file)?
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);
        let children = self.list(&dir, &path)?;
        Ok(Document {
            id: base_id(&path).to_string(),
            title,
            content,
            children,
            modified,
            path,
            uncommitted: false,
            favorite: false,
        })
    }

    fn list(&self, dir: &Path, parent: &str) -> Result<Vec<ShortDocument>> {
        let mut docs = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }
            let child_dir = entry.path();
            docs.push(ShortDocument {
                title: Self::content_title(&child_dir)?.unwrap_or_default(),
                has_children: Self::has_subdirs(&child_dir)?,
                path: join_path(parent, &id),
                id,
            });
        }
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    /// Whether the node has child nodes; hidden directories are not nodes.
    fn has_subdirs(dir: &Path) -> Result<bool> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && !entry.file_name().to_string_lossy().starts_with('.') {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn validate_title(title: &str) -> Result<()> {
        if title.trim().is_empty()
            || title.contains('/')
            || title.contains('\\')
            || title.contains('\0')
        {
            return Err(StoreError::InvalidTitle(title.to_string()));
        }
        Ok(())
    }

    /// Create the node directory and content file; returns the new path.
    pub(crate) fn create_node(&self, parent: &str, title: &str, content: &str) -> Result<String> {
        Self::validate_title(title)?;
        let (parent, parent_dir) = self.resolve(parent)?;
        if !parent_dir.is_dir() {
            return Err(StoreError::ParentMissing(parent));
        }
        let id = generate_id(&parent_dir, title, None);
        let dir = parent_dir.join(&id);
        fs::create_dir(&dir)?;
        if let Err(e) = fs::write(dir.join(format!("{title}{CONTENT_EXT}")), content) {
            let _ = fs::remove_dir_all(&dir);
            return Err(e.into());
        }
        let path = join_path(&parent, &id);
        debug!(path = %path, "created document node");
        Ok(path)
    }

    /// Remove a node directory unconditionally, used to roll back a create.
    pub(crate) fn remove_node(&self, path: &str) -> Result<()> {
        let (_, dir) = self.resolve_node(path)?;
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    /// Overwrite content, renaming file and directory when the title changes.
    /// Returns the node's path after the update.
    pub(crate) fn update_node(&self, path: &str, title: &str, content: &str) -> Result<String> {
        Self::validate_title(title)?;
        let (mut path, mut dir) = self.resolve_node(path)?;
        let old_title = Self::content_title(&dir)?;
        if old_title.as_deref() != Some(title) {
            // Directory first, so a failed file rename can be rolled back.
            let parent = parent_path(&path).to_string();
            let (_, parent_dir) = self.resolve(&parent)?;
            let current_id = base_id(&path).to_string();
            let new_id = generate_id(&parent_dir, title, Some(&current_id));
            let previous_dir = (new_id != current_id).then(|| dir.clone());
            if let Some(previous_dir) = &previous_dir {
                let new_dir = parent_dir.join(&new_id);
                fs::rename(previous_dir, &new_dir)?;
                dir = new_dir;
            }
            if let Some(old_title) = old_title {
                let renamed = fs::rename(
                    dir.join(format!("{old_title}{CONTENT_EXT}")),
                    dir.join(format!("{title}{CONTENT_EXT}")),
                );
                if let Err(e) = renamed {
                    if let Some(previous_dir) = &previous_dir {
                        let _ = fs::rename(&dir, previous_dir);
                    }
                    return Err(e.into());
                }
            }
            if previous_dir.is_some() {
                path = join_path(&parent, &new_id);
                debug!(from = %current_id, to = %path, "renamed document node");
            }
        }
        fs::write(dir.join(format!("{title}{CONTENT_EXT}")), content)?;
        Ok(path)
    }

    pub(crate) fn delete_node(&self, path: &str) -> Result<()> {
        let (path, dir) = self.resolve_node(path)?;
        if Self::has_subdirs(&dir)? {
            return Err(StoreError::HasChildren(path));
        }
        fs::remove_dir_all(&dir)?;
        debug!(path = %path, "deleted document node");
        Ok(())
    }

    /// Rename `source` under `target_parent`; returns the moved path.
    pub(crate) fn move_node(&self, source: &str, target_parent: &str) -> Result<String> {
        let (target, target_dir) = self.resolve(target_parent)?;
        if !target_dir.is_dir() {
            return Err(StoreError::TargetParentMissing(target));
        }
        let (source, source_dir) = self.resolve_node(source)?;
        if target == source || target.starts_with(&format!("{source}/")) {
            return Err(StoreError::InvalidPath(format!(
                "cannot move {source} into itself"
            )));
        }
        let id = base_id(&source);
        let destination = target_dir.join(id);
        let new_path = join_path(&target, id);
        if destination.exists() {
            return Err(StoreError::TargetExists(new_path));
        }
        fs::rename(&source_dir, &destination)?;
        debug!(from = %source, to = %new_path, "moved document node");
        Ok(new_path)
    }

    pub(crate) fn collect_subtree(&self, path: &str) -> Result<Vec<String>> {
        let (path, dir) = self.resolve_node(path)?;
        let mut paths = Vec::new();
        let walker = WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry.map_err(|e| {
                StoreError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
                }))
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&dir)
                .map_err(|_| StoreError::InvalidPath(entry.path().display().to_string()))?;
            let suffix: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if suffix.is_empty() {
                paths.push(path.clone());
            } else {
                paths.push(format!("{path}/{}", suffix.join("/")));
            }
        }
        Ok(paths)
    }

    pub(crate) fn collect_related(&self, path: &str) -> Result<BTreeMap<String, Vec<ShortDocument>>> {
        let (path, _) = self.resolve(path)?;
        let mut result = BTreeMap::new();
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        for i in 0..parts.len() {
            let current = parts[..=i].join("/");
            result.insert(current.clone(), self.child_documents(&current)?);
            let key = if i == 0 {
                ROOT_KEY.to_string()
            } else {
                parts[..i].join("/")
            };
            let siblings = if i == 0 {
                self.root_documents()?
            } else {
                self.child_documents(&key)?
            };
            result.insert(key, siblings);
        }
        Ok(result)
    }
}

impl Storage for TreeStore {
    fn root_documents(&self) -> Result<Vec<ShortDocument>> {
        self.list(&self.docs_dir, "")
    }

    fn child_documents(&self, parent_path: &str) -> Result<Vec<ShortDocument>> {
        let (parent, dir) = self.resolve_node(parent_path)?;
        self.list(&dir, &parent)
    }

    fn document(&self, path: &str) -> Result<Document> {
        self.read_document(path)
    }

    fn related_documents(&self, path: &str) -> Result<BTreeMap<String, Vec<ShortDocument>>> {
        self.collect_related(path)
    }

    fn create_document(&self, parent_path: &str, title: &str, content: &str) -> Result<Document> {
        let _guard = self.writes.lock();
        let path = self.create_node(parent_path, title, content)?;
        self.read_document(&path)
    }

    fn update_document(
        &self,
        path: &str,
        title: &str,
        content: &str,
        _commit: bool,
    ) -> Result<Document> {
        let _guard = self.writes.lock();
        let path = self.update_node(path, title, content)?;
        self.read_document(&path)
    }

    fn delete_document(&self, path: &str) -> Result<()> {
        let _guard = self.writes.lock();
        self.delete_node(path)
    }

    fn move_document(&self, source: &str, target_parent: &str) -> Result<()> {
        let _guard = self.writes.lock();
        self.move_node(source, target_parent).map(|_| ())
    }

    fn subtree_paths(&self, path: &str) -> Result<Vec<String>> {
        self.collect_subtree(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, TreeStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TreeStore::new(dir.path().join("docs")).unwrap();
        (dir, store)
    }

    #[test]
    fn colliding_titles_get_numbered_ids() {
        let (_dir, store) = store();
        let a = store.create_document("", "Hello World!", "one").unwrap();
        let b = store.create_document("", "Hello World!", "two").unwrap();
        let c = store.create_document("", "hello world", "three").unwrap();
        assert_eq!(a.id, "hello_world");
        assert_eq!(b.id, "hello_world(1)");
        assert_eq!(c.id, "hello_world(2)");
        assert_eq!(b.content, "two");
        assert!(b.children.is_empty());
    }

    #[test]
    fn create_under_missing_parent_is_recoverable() {
        let (_dir, store) = store();
        let err = store.create_document("nope", "Child", "x").unwrap_err();
        assert!(matches!(err, StoreError::ParentMissing(_)));
        let doc = store.create_document("", "Child", "x").unwrap();
        assert_eq!(doc.path, "child");
    }

    #[test]
    fn create_nested_and_list() {
        let (_dir, store) = store();
        store.create_document("", "Guide", "").unwrap();
        store.create_document("guide", "Setup", "steps").unwrap();
        store.create_document("guide", "Advanced", "more").unwrap();

        let roots = store.root_documents().unwrap();
        assert_eq!(roots.len(), 1);
        assert!(roots[0].has_children);

        let children = store.child_documents("guide").unwrap();
        let ids: Vec<_> = children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["advanced", "setup"]);
        assert_eq!(children[1].path, "guide/setup");
        assert_eq!(children[1].title, "Setup");

        let guide = store.document("guide").unwrap();
        assert_eq!(guide.children.len(), 2);
        assert!(guide.modified.is_some());
    }

    #[test]
    fn update_with_new_title_renames_node() {
        let (_dir, store) = store();
        store.create_document("", "Draft", "v1").unwrap();
        let doc = store.update_document("draft", "Final Plan", "v2", true).unwrap();
        assert_eq!(doc.path, "final_plan");
        assert_eq!(doc.title, "Final Plan");
        assert_eq!(doc.content, "v2");
        assert!(matches!(store.document("draft"), Err(StoreError::NotFound(_))));
        assert!(store.docs_dir().join("final_plan/Final Plan.md").is_file());
    }

    #[test]
    fn failed_title_rename_leaves_node_in_place() {
        let (_dir, store) = store();
        store.create_document("", "Draft", "v1").unwrap();
        // A directory squatting on the new content file name makes the
        // file rename fail after the node directory has moved.
        fs::create_dir(store.docs_dir().join("draft/Final Plan.md")).unwrap();

        assert!(store.update_document("draft", "Final Plan", "v2", true).is_err());
        let doc = store.document("draft").unwrap();
        assert_eq!(doc.title, "Draft");
        assert_eq!(doc.content, "v1");
        assert!(!store.docs_dir().join("final_plan").exists());
    }

    #[test]
    fn title_rename_leaves_no_stale_files() {
        let (_dir, store) = store();
        store.create_document("", "Draft", "v1").unwrap();
        store.update_document("draft", "Final Plan", "v2", true).unwrap();
        assert!(!store.docs_dir().join("draft").exists());
        assert!(!store.docs_dir().join("final_plan/Draft.md").exists());
        let names: Vec<_> = fs::read_dir(store.docs_dir().join("final_plan"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Final Plan.md"]);
    }

    #[test]
    fn hidden_directories_are_not_children() {
        let (_dir, store) = store();
        store.create_document("", "Doc", "").unwrap();
        fs::create_dir(store.docs_dir().join("doc/.cache")).unwrap();

        let roots = store.root_documents().unwrap();
        assert!(!roots[0].has_children);
        assert!(store.child_documents("doc").unwrap().is_empty());
        store.delete_document("doc").unwrap();
        assert!(store.root_documents().unwrap().is_empty());
    }

    #[test]
    fn update_keeping_slug_keeps_id() {
        let (_dir, store) = store();
        store.create_document("", "Notes", "v1").unwrap();
        let doc = store.update_document("notes", "NOTES", "v2", false).unwrap();
        assert_eq!(doc.path, "notes");
        assert_eq!(doc.title, "NOTES");
    }

    #[test]
    fn delete_refuses_nodes_with_children() {
        let (_dir, store) = store();
        store.create_document("", "Parent", "").unwrap();
        store.create_document("parent", "Kid", "").unwrap();
        let err = store.delete_document("parent").unwrap_err();
        assert!(matches!(err, StoreError::HasChildren(_)));
        assert!(store.document("parent/kid").is_ok());

        store.delete_document("parent/kid").unwrap();
        store.delete_document("parent").unwrap();
        assert!(store.root_documents().unwrap().is_empty());
    }

    #[test]
    fn move_validates_before_renaming() {
        let (_dir, store) = store();
        store.create_document("", "A", "a").unwrap();
        store.create_document("", "B", "b").unwrap();
        store.create_document("b", "A", "nested").unwrap();

        let err = store.move_document("a", "missing").unwrap_err();
        assert!(matches!(err, StoreError::TargetParentMissing(_)));
        let err = store.move_document("a", "b").unwrap_err();
        assert!(matches!(err, StoreError::TargetExists(_)));
        let err = store.move_document("b", "b/a").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
        assert_eq!(store.document("a").unwrap().content, "a");
        assert_eq!(store.document("b/a").unwrap().content, "nested");

        store.delete_document("b/a").unwrap();
        store.move_document("a", "b").unwrap();
        assert_eq!(store.document("b/a").unwrap().content, "a");
        assert!(matches!(store.document("a"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn related_documents_cover_every_ancestor() {
        let (_dir, store) = store();
        store.create_document("", "One", "").unwrap();
        store.create_document("", "Two", "").unwrap();
        store.create_document("one", "Sub", "").unwrap();
        store.create_document("one/sub", "Leaf", "").unwrap();

        let related = store.related_documents("one/sub").unwrap();
        let keys: Vec<_> = related.keys().cloned().collect();
        assert_eq!(keys, vec!["one", "one/sub", "root"]);
        assert_eq!(related["root"].len(), 2);
        assert_eq!(related["one"][0].id, "sub");
        assert_eq!(related["one/sub"][0].id, "leaf");
    }

    #[test]
    fn subtree_paths_walk_descendants() {
        let (_dir, store) = store();
        store.create_document("", "Top", "").unwrap();
        store.create_document("top", "Mid", "").unwrap();
        store.create_document("top/mid", "Low", "").unwrap();
        let paths = store.subtree_paths("top").unwrap();
        assert_eq!(paths, vec!["top", "top/mid", "top/mid/low"]);
    }

    #[test]
    fn paths_cannot_escape_docs_dir() {
        let (_dir, store) = store();
        assert!(matches!(
            store.document("../etc"),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.create_document("", "a/b", ""),
            Err(StoreError::InvalidTitle(_))
        ));
    }
}
