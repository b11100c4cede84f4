//! In-memory inverted index over stemmed tokens.
//!
//! Every whitespace separated word of `title + " " + content` is lowercased,
//! stripped of surrounding punctuation and stemmed once per configured
//! language. Each stem keeps an occurrence count per document path, and a
//! query scores a document by summing the counts of its own stems.

use std::collections::HashMap;

use parking_lot::RwLock;
use tantivy::tokenizer::{Language, RawTokenizer, Stemmer, TextAnalyzer, TokenStream};
use tracing::{debug, info};

use crate::document::Document;
use crate::error::{Result, StoreError};
use crate::storage::Storage;

pub const DEFAULT_PAGE_SIZE: usize = 10;

const TRIM_CHARS: &[char] = &['.', ',', '!', '?', '"', '\'', '(', ')', '[', ']', '{', '}'];

fn parse_language(name: &str) -> Result<Language> {
    let language = match name.trim().to_ascii_lowercase().as_str() {
        "arabic" => Language::Arabic,
        "danish" => Language::Danish,
        "dutch" => Language::Dutch,
        "english" => Language::English,
        "finnish" => Language::Finnish,
        "french" => Language::French,
        "german" => Language::German,
        "greek" => Language::Greek,
        "hungarian" => Language::Hungarian,
        "italian" => Language::Italian,
        "norwegian" => Language::Norwegian,
        "portuguese" => Language::Portuguese,
        "romanian" => Language::Romanian,
        "russian" => Language::Russian,
        "spanish" => Language::Spanish,
        "swedish" => Language::Swedish,
        "tamil" => Language::Tamil,
        "turkish" => Language::Turkish,
        other => {
            return Err(StoreError::InvalidInput(format!(
                "unsupported stemming language: {other}"
            )))
        }
    };
    Ok(language)
}

#[derive(Default)]
struct Postings {
    /// stem -> document path -> occurrences
    index: HashMap<String, HashMap<String, usize>>,
    documents: HashMap<String, Document>,
}

pub struct SearchIndex {
    languages: Vec<String>,
    analyzers: Vec<TextAnalyzer>,
    postings: RwLock<Postings>,
}

impl SearchIndex {
    /// Build an index stemming under each of `languages`, e.g. `["english", "russian"]`.
    pub fn new<S: AsRef<str>>(languages: &[S]) -> Result<Self> {
        let mut names = Vec::new();
        let mut analyzers = Vec::new();
        for name in languages {
            let name = name.as_ref().trim().to_ascii_lowercase();
            if name.is_empty() || names.contains(&name) {
                continue;
            }
            let language = parse_language(&name)?;
            analyzers.push(TextAnalyzer::from(RawTokenizer).filter(Stemmer::new(language)));
            names.push(name);
        }
        if analyzers.is_empty() {
            return Err(StoreError::InvalidInput(
                "at least one stemming language is required".to_string(),
            ));
        }
        Ok(Self {
            languages: names,
            analyzers,
            postings: RwLock::new(Postings::default()),
        })
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// One stem per word and language; words that stem to nothing are skipped.
    fn stems(&self, text: &str) -> Vec<String> {
        let mut stems = Vec::new();
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            let word = word.trim_matches(TRIM_CHARS);
            if word.is_empty() {
                continue;
            }
            for analyzer in &self.analyzers {
                let mut stream = analyzer.token_stream(word);
                while stream.advance() {
                    let stem = &stream.token().text;
                    if !stem.is_empty() {
                        stems.push(stem.clone());
                    }
                }
            }
        }
        stems
    }

    fn document_stems(&self, doc: &Document) -> Vec<String> {
        self.stems(&format!("{} {}", doc.title, doc.content))
    }

    /// Drop `path` from every bucket its stored document contributed to.
    fn evict(&self, postings: &mut Postings, path: &str) -> bool {
        let Some(doc) = postings.documents.remove(path) else {
            return false;
        };
        for stem in self.document_stems(&doc) {
            if let Some(bucket) = postings.index.get_mut(&stem) {
                bucket.remove(path);
                if bucket.is_empty() {
                    postings.index.remove(&stem);
                }
            }
        }
        true
    }

    /// Index `doc` under its path, replacing whatever was indexed there.
    pub fn index_document(&self, doc: Document) {
        let stems = self.document_stems(&doc);
        let path = doc.path.clone();
        let mut postings = self.postings.write();
        self.evict(&mut postings, &path);
        for stem in stems {
            *postings
                .index
                .entry(stem)
                .or_default()
                .entry(path.clone())
                .or_insert(0) += 1;
        }
        postings.documents.insert(path, doc);
    }

    /// Remove `path` from the index. Unknown paths are ignored.
    pub fn delete_document(&self, path: &str) {
        let mut postings = self.postings.write();
        if self.evict(&mut postings, path) {
            debug!(path, "removed document from search index");
        }
    }

    /// Remove `path` and every indexed path below it.
    pub fn delete_subtree(&self, path: &str) {
        let prefix = format!("{path}/");
        let mut postings = self.postings.write();
        let doomed: Vec<String> = postings
            .documents
            .keys()
            .filter(|p| p.as_str() == path || p.starts_with(&prefix))
            .cloned()
            .collect();
        for p in &doomed {
            self.evict(&mut postings, p);
        }
        debug!(path, removed = doomed.len(), "removed subtree from search index");
    }

    /// One page of matches ordered by score, then path, plus the total
    /// number of matching documents.
    pub fn search(&self, query: &str, page: usize, page_size: usize) -> (Vec<Document>, usize) {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        let stems = self.stems(query);

        let postings = self.postings.read();
        let mut scores: HashMap<&str, usize> = HashMap::new();
        for stem in &stems {
            if let Some(bucket) = postings.index.get(stem) {
                for (path, count) in bucket {
                    *scores.entry(path.as_str()).or_insert(0) += count;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let total = ranked.len();

        let results = ranked
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .filter_map(|(path, _)| postings.documents.get(path).cloned())
            .collect();
        (results, total)
    }

    /// Index every document reachable from the roots of `storage`.
    pub fn load_from_storage(&self, storage: &dyn Storage) -> Result<usize> {
        let mut count = 0;
        for root in storage.root_documents()? {
            count += self.index_subtree(storage, &root.path)?;
        }
        info!(documents = count, "search index loaded");
        Ok(count)
    }

    /// Index the node at `path` and all of its descendants.
    pub fn index_subtree(&self, storage: &dyn Storage, path: &str) -> Result<usize> {
        let doc = storage.document(path)?;
        let children: Vec<String> = doc.children.iter().map(|c| c.path.clone()).collect();
        self.index_document(doc);
        let mut count = 1;
        for child in children {
            count += self.index_subtree(storage, &child)?;
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.postings.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, path: &str) -> bool {
        self.postings.read().documents.contains_key(path)
    }

    #[cfg(test)]
    fn occurrences(&self, stem: &str, path: &str) -> usize {
        let postings = self.postings.read();
        postings
            .index
            .get(stem)
            .and_then(|bucket| bucket.get(path))
            .copied()
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn stem_count(&self) -> usize {
        self.postings.read().index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TreeStore;

    fn doc(path: &str, title: &str, content: &str) -> Document {
        Document {
            id: crate::document::base_id(path).to_string(),
            title: title.to_string(),
            content: content.to_string(),
            path: path.to_string(),
            ..Document::default()
        }
    }

    fn english() -> SearchIndex {
        SearchIndex::new(&["english"]).unwrap()
    }

    #[test]
    fn unknown_language_is_rejected() {
        assert!(matches!(
            SearchIndex::new(&["klingon"]),
            Err(StoreError::InvalidInput(_))
        ));
        let empty: [&str; 0] = [];
        assert!(SearchIndex::new(&empty).is_err());
    }

    #[test]
    fn stems_match_inflections() {
        let index = english();
        index.index_document(doc("a", "Running", "The runner runs (quickly)."));
        let (hits, total) = index.search("run", 1, 10);
        assert_eq!(total, 1);
        assert_eq!(hits[0].path, "a");
        assert_eq!(index.occurrences("run", "a"), 2);
    }

    #[test]
    fn russian_words_are_stemmed() {
        let index = SearchIndex::new(&["english", "russian"]).unwrap();
        index.index_document(doc("ru", "Привет мир", ""));
        let (hits, _) = index.search("мира", 1, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "ru");
    }

    #[test]
    fn deleted_documents_disappear() {
        let index = english();
        index.index_document(doc("keep", "shared", ""));
        index.index_document(doc("gone", "shared unique", ""));
        index.delete_document("gone");

        assert!(index.search("unique", 1, 10).0.is_empty());
        let (hits, total) = index.search("shared", 1, 10);
        assert_eq!(total, 1);
        assert_eq!(hits[0].path, "keep");
        assert_eq!(index.stem_count(), 1);

        index.delete_document("never-indexed");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn reindexing_does_not_double_counts() {
        let index = english();
        let d = doc("a", "apple", "apple pie");
        index.index_document(d.clone());
        let once = index.occurrences("appl", "a");
        index.index_document(d.clone());
        assert_eq!(index.occurrences("appl", "a"), once);
        for _ in 0..3 {
            index.delete_document("a");
            index.index_document(d.clone());
        }
        assert_eq!(index.occurrences("appl", "a"), once);
        assert_eq!(once, 2);
    }

    #[test]
    fn updated_content_replaces_old_terms() {
        let index = english();
        index.index_document(doc("a", "Note", "banana"));
        index.index_document(doc("a", "Note", "cherry"));
        assert!(index.search("banana", 1, 10).0.is_empty());
        assert_eq!(index.search("cherry", 1, 10).1, 1);
    }

    #[test]
    fn pagination_windows_a_global_order() {
        let index = english();
        for i in 0..25 {
            index.index_document(doc(&format!("doc{i:02}"), "Apple", ""));
        }
        let (page3, total) = index.search("apple", 3, 10);
        assert_eq!(total, 25);
        assert_eq!(page3.len(), 5);
        assert_eq!(page3[0].path, "doc20");

        let (page4, total) = index.search("apple", 4, 10);
        assert!(page4.is_empty());
        assert_eq!(total, 25);

        let (first, _) = index.search("apple", 0, 0);
        assert_eq!(first.len(), DEFAULT_PAGE_SIZE);
        assert_eq!(first[0].path, "doc00");
    }

    #[test]
    fn higher_scores_rank_first_and_ties_sort_by_path() {
        let index = english();
        index.index_document(doc("b", "world", ""));
        index.index_document(doc("a", "world", ""));
        index.index_document(doc("c", "world", "world world"));
        let (hits, _) = index.search("World!", 1, 10);
        let paths: Vec<_> = hits.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["c", "a", "b"]);
    }

    #[test]
    fn subtree_delete_spares_siblings_with_shared_prefix() {
        let index = english();
        index.index_document(doc("guide", "topic", ""));
        index.index_document(doc("guide/setup", "topic", ""));
        index.index_document(doc("guides", "topic", ""));
        index.delete_subtree("guide");
        let (hits, _) = index.search("topic", 1, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "guides");
    }

    #[test]
    fn load_walks_the_whole_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = TreeStore::new(dir.path().join("docs")).unwrap();
        store.create_document("", "Hello World!", "first").unwrap();
        store.create_document("", "Hello World!", "second").unwrap();
        store.create_document("hello_world", "Nested", "deep world").unwrap();

        let index = english();
        assert_eq!(index.load_from_storage(&store).unwrap(), 3);
        let (hits, total) = index.search("world", 1, 10);
        assert_eq!(total, 3);
        let paths: Vec<_> = hits.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["hello_world", "hello_world(1)", "hello_world/nested"]
        );
    }
}
