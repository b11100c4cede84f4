use std::sync::Arc;

use tracing::debug;

use crate::document::Document;
use crate::error::Result;
use crate::search::SearchIndex;
use crate::storage::Storage;

/// Mirrors storage mutations into the search index.
///
/// Callers report what happened after the storage call succeeded; the live
/// index decides whether a single document or a whole subtree has to be
/// re-read.
pub struct LiveIndex {
    index: Arc<SearchIndex>,
    storage: Arc<dyn Storage>,
}

impl LiveIndex {
    pub fn new(index: Arc<SearchIndex>, storage: Arc<dyn Storage>) -> Self {
        Self { index, storage }
    }

    pub fn index(&self) -> &Arc<SearchIndex> {
        &self.index
    }

    /// Index everything currently in storage.
    pub fn warm(&self) -> Result<usize> {
        self.index.load_from_storage(self.storage.as_ref())
    }

    pub fn created(&self, doc: &Document) {
        self.index.index_document(doc.clone());
    }

    /// `old_path` is where the document lived before the update. A title
    /// change renames the node, which moves every descendant as well.
    pub fn updated(&self, old_path: &str, doc: &Document) -> Result<()> {
        let old_path = old_path.trim_matches('/');
        if old_path == doc.path {
            self.index.index_document(doc.clone());
            return Ok(());
        }
        self.moved(old_path, &doc.path)
    }

    pub fn moved(&self, old_path: &str, new_path: &str) -> Result<()> {
        let old_path = old_path.trim_matches('/');
        self.index.delete_subtree(old_path);
        let count = self.index.index_subtree(self.storage.as_ref(), new_path)?;
        debug!(from = old_path, to = new_path, documents = count, "re-indexed moved subtree");
        Ok(())
    }

    pub fn deleted(&self, path: &str) {
        self.index.delete_subtree(path.trim_matches('/'));
    }

    pub fn search(&self, query: &str, page: usize, page_size: usize) -> (Vec<Document>, usize) {
        self.index.search(query, page, page_size)
    }
}
