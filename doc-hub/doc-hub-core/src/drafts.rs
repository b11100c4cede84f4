//! Unsaved drafts, one JSON file per draft.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StoreError};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Draft {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    /// Drafts live in `<base_dir>/drafts`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = base_dir.as_ref().join("drafts");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn file(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty()
            || id.starts_with('.')
            || id.contains('/')
            || id.contains('\\')
            || id.contains('\0')
        {
            return Err(StoreError::InvalidInput(format!("invalid draft id: {id:?}")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    pub fn get(&self, id: &str) -> Result<Draft> {
        let data = match fs::read(self.file(id)?) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("draft {id}")))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    /// All readable drafts ordered by id.
    pub fn list(&self) -> Result<Vec<Draft>> {
        let mut drafts = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.get(id) {
                Ok(draft) => drafts.push(draft),
                Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable draft"),
            }
        }
        drafts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(drafts)
    }

    /// Create or replace a draft; a missing `created_at` is set to now.
    pub fn upsert(&self, mut draft: Draft) -> Result<Draft> {
        let file = self.file(&draft.id)?;
        draft.created_at.get_or_insert_with(Utc::now);
        fs::write(file, serde_json::to_vec(&draft)?)?;
        Ok(draft)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.file(id)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("draft {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str) -> Draft {
        Draft {
            id: id.to_string(),
            title: format!("Title {id}"),
            content: "body".to_string(),
            ..Draft::default()
        }
    }

    #[test]
    fn upsert_get_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path()).unwrap();

        let saved = store.upsert(draft("d1")).unwrap();
        let created = saved.created_at.unwrap();
        assert_eq!(store.get("d1").unwrap(), saved);

        let mut edited = saved.clone();
        edited.content = "changed".to_string();
        store.upsert(edited).unwrap();
        let reread = store.get("d1").unwrap();
        assert_eq!(reread.content, "changed");
        assert_eq!(reread.created_at, Some(created));

        store.delete("d1").unwrap();
        assert!(matches!(store.get("d1"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("d1"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn invalid_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path()).unwrap();
        assert!(matches!(store.upsert(draft("")), Err(StoreError::InvalidInput(_))));
        assert!(matches!(store.get("../x"), Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn list_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path()).unwrap();
        store.upsert(draft("b")).unwrap();
        store.upsert(draft("a")).unwrap();
        fs::write(dir.path().join("drafts/broken.json"), b"{not json").unwrap();
        fs::write(dir.path().join("drafts/notes.txt"), b"ignored").unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
