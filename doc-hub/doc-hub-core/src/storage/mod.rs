//! Directory-per-node document storage.
//!
//! Every document is a directory under `docs/` holding a single `<title>.md`
//! file and the directories of its children. [`TreeStore`] implements the
//! plain filesystem backend, [`GitStorage`] layers a git history over the same
//! layout and additionally exposes [`HistoryCapable`].

use std::collections::BTreeMap;

use crate::document::{Document, HistoryEntry, ShortDocument};
use crate::error::Result;

pub mod git;
mod lineage;
pub mod tree;


pub use git::GitStorage;
pub use tree::TreeStore;

/// Operations every storage backend provides.
pub trait Storage: Send + Sync {
    fn root_documents(&self) -> Result<Vec<ShortDocument>>;

    fn child_documents(&self, parent_path: &str) -> Result<Vec<ShortDocument>>;

    fn document(&self, path: &str) -> Result<Document>;

    /// Siblings and children of every ancestor of `path`, keyed by path
    /// (`"root"` for the top level).
    fn related_documents(&self, path: &str) -> Result<BTreeMap<String, Vec<ShortDocument>>>;

    /// Fails with `ParentMissing` when `parent_path` is not an existing node.
    fn create_document(&self, parent_path: &str, title: &str, content: &str) -> Result<Document>;

    /// A title change renames the node, so the returned path may differ from
    /// `path`.
    fn update_document(&self, path: &str, title: &str, content: &str, commit: bool)
        -> Result<Document>;

    fn delete_document(&self, path: &str) -> Result<()>;

    /// Move `source` under `target_parent`, keeping its id.
    fn move_document(&self, source: &str, target_parent: &str) -> Result<()>;

    /// Every node path from `path` downwards, `path` first.
    fn subtree_paths(&self, path: &str) -> Result<Vec<String>>;

    /// Version history, when the backend keeps one.
    fn history(&self) -> Option<&dyn HistoryCapable> {
        None
    }
}

/// Backends that keep a per-document history.
pub trait HistoryCapable: Send + Sync {
    fn document_history(&self, path: &str) -> Result<Vec<HistoryEntry>>;

    fn historical_document(&self, path: &str, commit_id: &str) -> Result<Document>;

    fn restore_historical_document(
        &self,
        current_path: &str,
        original_path: &str,
        commit_id: &str,
    ) -> Result<Document>;
}
