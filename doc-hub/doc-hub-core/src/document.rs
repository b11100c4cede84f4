//! Value types shared by the stores, the search index and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node of the document tree together with its content.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ShortDocument>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uncommitted: bool,
    #[serde(default)]
    pub favorite: bool,
}

impl Document {
    pub fn to_short(&self) -> ShortDocument {
        ShortDocument {
            id: self.id.clone(),
            title: self.title.clone(),
            has_children: !self.children.is_empty(),
            path: self.path.clone(),
        }
    }
}

/// Listing projection of a [`Document`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShortDocument {
    pub id: String,
    pub title: String,
    pub has_children: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// One commit attributed to a document's lineage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub commit_hash: String,
    pub date: DateTime<Utc>,
    pub message: String,
    pub added: usize,
    pub deleted: usize,
    /// Document path the tracked file had in this commit.
    pub file_path: String,
}

/// Parent path of a slash separated document path, `""` for root nodes.
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Last segment of a document path.
pub fn base_id(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, id)| id).unwrap_or(path)
}

/// Join a parent path and a child id.
pub fn join_path(parent: &str, id: &str) -> String {
    if parent.is_empty() {
        id.to_string()
    } else {
        format!("{parent}/{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(parent_path("a/b/c"), "a/b");
        assert_eq!(parent_path("a"), "");
        assert_eq!(base_id("a/b/c"), "c");
        assert_eq!(base_id("a"), "a");
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a/b", "c"), "a/b/c");
    }

    #[test]
    fn short_document_uses_camel_case() {
        let short = ShortDocument {
            id: "x".into(),
            title: "X".into(),
            has_children: true,
            path: "x".into(),
        };
        let json = serde_json::to_value(&short).unwrap();
        assert_eq!(json["hasChildren"], serde_json::json!(true));
    }
}
