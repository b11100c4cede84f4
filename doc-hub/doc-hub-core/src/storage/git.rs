//! Git-versioned backend.
//!
//! The repository lives in the data directory and tracks `docs/`. Every
//! committing mutation runs under the repository mutex from the filesystem
//! change through the commit, so concurrent requests never stage each
//! other's work.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, ErrorCode, IndexAddOption, Oid, Repository, Signature, Status, StatusOptions};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::lineage::{self, content_file, DOCS_DIR};
use super::{HistoryCapable, Storage, TreeStore};
use crate::document::{base_id, Document, HistoryEntry, ShortDocument};
use crate::error::{Result, StoreError};

const AUTHOR_NAME: &str = "Document System";
const AUTHOR_EMAIL: &str = "docs@system";

pub struct GitStorage {
    base_dir: PathBuf,
    tree: TreeStore,
    repo: Mutex<Repository>,
}

impl GitStorage {
    /// Open the repository at `base_dir`, initializing it when absent.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        let tree = TreeStore::new(base_dir.join(DOCS_DIR))?;
        let repo = if base_dir.join(".git").exists() {
            Repository::open(&base_dir)?
        } else {
            info!(dir = %base_dir.display(), "initializing document repository");
            Repository::init(&base_dir)?
        };
        Ok(Self {
            base_dir,
            tree,
            repo: Mutex::new(repo),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    /// Stage everything under `docs/` and commit it. Returns `None` when
    /// the working tree matches HEAD.
    pub fn commit(&self, message: &str) -> Result<Option<Oid>> {
        let repo = self.repo.lock();
        Self::commit_changes(&repo, message)
    }

    fn commit_changes(repo: &Repository, message: &str) -> Result<Option<Oid>> {
        let mut index = repo.index()?;
        index.add_all([DOCS_DIR], IndexAddOption::DEFAULT, None)?;
        index.update_all([DOCS_DIR], None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = Self::head_commit(repo)?;
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            debug!(message, "working tree clean, nothing to commit");
            return Ok(None);
        }

        let tree = repo.find_tree(tree_id)?;
        let sig = Signature::now(AUTHOR_NAME, AUTHOR_EMAIL)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        debug!(commit = %oid, message, "committed document changes");
        Ok(Some(oid))
    }

    fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>> {
        match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether anything under the node differs from HEAD, staged or not.
    fn is_uncommitted(repo: &Repository, doc_path: &str) -> Result<bool> {
        let dir = format!("{DOCS_DIR}/{doc_path}");
        let prefix = format!("{dir}/");
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .pathspec(dir.as_str());
        let statuses = repo.statuses(Some(&mut opts))?;
        Ok(statuses.iter().any(|entry| {
            entry.status() != Status::CURRENT
                && entry.path().is_some_and(|p| p.starts_with(&prefix))
        }))
    }

    fn load(&self, repo: &Repository, path: &str) -> Result<Document> {
        let mut doc = self.tree.read_document(path)?;
        doc.uncommitted = Self::is_uncommitted(repo, &doc.path)?;
        Ok(doc)
    }
}

impl Storage for GitStorage {
    fn root_documents(&self) -> Result<Vec<ShortDocument>> {
        self.tree.root_documents()
    }

    fn child_documents(&self, parent_path: &str) -> Result<Vec<ShortDocument>> {
        self.tree.child_documents(parent_path)
    }

    fn document(&self, path: &str) -> Result<Document> {
        let repo = self.repo.lock();
        self.load(&repo, path)
    }

    fn related_documents(&self, path: &str) -> Result<BTreeMap<String, Vec<ShortDocument>>> {
        self.tree.collect_related(path)
    }

    fn create_document(&self, parent_path: &str, title: &str, content: &str) -> Result<Document> {
        let repo = self.repo.lock();
        let path = self.tree.create_node(parent_path, title, content)?;
        if let Err(e) = Self::commit_changes(&repo, &format!("Create document: {path}")) {
            let _ = self.tree.remove_node(&path);
            return Err(e);
        }
        self.load(&repo, &path)
    }

    fn update_document(
        &self,
        path: &str,
        title: &str,
        content: &str,
        commit: bool,
    ) -> Result<Document> {
        let repo = self.repo.lock();
        let path = self.tree.update_node(path, title, content)?;
        if commit {
            Self::commit_changes(&repo, &format!("Update document: {path}"))?;
        }
        self.load(&repo, &path)
    }

    fn delete_document(&self, path: &str) -> Result<()> {
        let repo = self.repo.lock();
        self.tree.delete_node(path)?;
        Self::commit_changes(&repo, &format!("Delete document: {}", path.trim_matches('/')))?;
        Ok(())
    }

    fn move_document(&self, source: &str, target_parent: &str) -> Result<()> {
        let repo = self.repo.lock();
        self.tree.move_node(source, target_parent)?;
        Self::commit_changes(
            &repo,
            &format!(
                "Move document from {} to {}",
                source.trim_matches('/'),
                target_parent.trim_matches('/')
            ),
        )?;
        Ok(())
    }

    fn subtree_paths(&self, path: &str) -> Result<Vec<String>> {
        self.tree.collect_subtree(path)
    }

    fn history(&self) -> Option<&dyn HistoryCapable> {
        Some(self)
    }
}

impl HistoryCapable for GitStorage {
    fn document_history(&self, path: &str) -> Result<Vec<HistoryEntry>> {
        let repo = self.repo.lock();
        let (path, _) = self.tree.resolve_node(path)?;
        let title = self.tree.title_of(&path)?;
        let Some(head) = Self::head_commit(&repo)? else {
            return Ok(Vec::new());
        };
        let mut visited = lineage::Visited::default();
        lineage::walk(&repo, head.id(), &content_file(&path, &title), &mut visited)
    }

    fn historical_document(&self, path: &str, commit_id: &str) -> Result<Document> {
        let repo = self.repo.lock();
        let (path, _) = self.tree.resolve(path)?;
        if path.is_empty() {
            return Err(StoreError::NotFound(path));
        }
        let (title, content) = lineage::read_snapshot(&repo, &path, commit_id)?;
        Ok(Document {
            id: base_id(&path).to_string(),
            title,
            content,
            path,
            ..Document::default()
        })
    }

    fn restore_historical_document(
        &self,
        current_path: &str,
        original_path: &str,
        commit_id: &str,
    ) -> Result<Document> {
        let repo = self.repo.lock();
        let (original, _) = self.tree.resolve(original_path)?;
        if original.is_empty() {
            return Err(StoreError::NotFound(original));
        }
        let (title, content) = lineage::read_snapshot(&repo, &original, commit_id)?;

        let (current, dir) = self.tree.resolve(current_path)?;
        if current.is_empty() {
            return Err(StoreError::NotFound(current));
        }
        let current = if dir.is_dir() {
            self.tree.update_node(&current, &title, &content)?
        } else {
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(format!("{title}.md")), &content)?;
            current
        };
        debug!(path = %current, commit = commit_id, "restored document content");

        Self::commit_changes(
            &repo,
            &format!(
                "Restore document {current} to state from commit {commit_id} (original path: {original})"
            ),
        )?;
        self.load(&repo, &current)
    }
}
