//! Rename-aware history reconstruction over the git object database.
//!
//! A document's content file changes path whenever the document is renamed
//! or moved. Diffs are computed without rename detection, so a rename shows
//! up as the tracked blob being deleted at one path and added at another.
//! The walk follows such deletions into the older path and appends that
//! segment after the commit that revealed it.

use std::collections::HashSet;
use std::path::Path;

use chrono::{TimeZone, Utc};
use git2::{Delta, ObjectType, Oid, Repository, Sort};
use tracing::debug;

use crate::document::HistoryEntry;
use crate::error::{Result, StoreError};

pub(crate) const DOCS_DIR: &str = "docs";

/// Repository-relative path of a document's content file.
pub(crate) fn content_file(doc_path: &str, title: &str) -> String {
    format!("{DOCS_DIR}/{doc_path}/{title}.md")
}

/// Document path owning a repository-relative content file path.
fn owning_document(file: &str) -> String {
    let relative = file
        .strip_prefix(DOCS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(file);
    relative
        .rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default()
}

/// State shared by a lineage walk and every nested segment it follows.
#[derive(Default)]
pub(crate) struct Visited {
    /// Content changes already attributed, as (added, path, blob). The path
    /// is part of the key because unrelated files often share a blob, most
    /// commonly the empty one.
    changes: HashSet<(bool, String, Oid)>,
    /// Commits already turned into history entries.
    commits: HashSet<Oid>,
}

/// History of `file` reachable from `start`, newest first.
pub(crate) fn walk(
    repo: &Repository,
    start: Oid,
    file: &str,
    visited: &mut Visited,
) -> Result<Vec<HistoryEntry>> {
    let tracked = Path::new(file);
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push(start)?;

    let mut history = Vec::new();

    for oid in revwalk {
        let oid = oid?;
        if visited.commits.contains(&oid) {
            continue;
        }
        let commit = repo.find_commit(oid)?;
        if commit.parent_count() == 0 {
            continue;
        }
        let parent = commit.parent(0)?;
        let diff = repo.diff_tree_to_tree(Some(&parent.tree()?), Some(&commit.tree()?), None)?;

        let mut arrived = None;
        let mut touches = false;
        for delta in diff.deltas() {
            if delta.new_file().path() == Some(tracked) {
                touches = true;
                if delta.status() == Delta::Added {
                    arrived = Some(delta.new_file().id());
                }
            } else if delta.old_file().path() == Some(tracked) {
                touches = true;
            }
        }
        if !touches {
            continue;
        }

        let mut relevant = 0usize;
        let mut deletions: Vec<(Oid, &Path)> = Vec::new();
        for delta in diff.deltas() {
            let (added, side) = match delta.status() {
                Delta::Added => (true, delta.new_file()),
                Delta::Deleted => (false, delta.old_file()),
                _ => {
                    relevant += 1;
                    continue;
                }
            };
            let Some(path) = side.path() else {
                continue;
            };
            let key = (added, path.to_string_lossy().into_owned(), side.id());
            if visited.changes.insert(key) {
                relevant += 1;
            }
            if !added && path != tracked {
                deletions.push((side.id(), path));
            }
        }
        if relevant == 0 {
            continue;
        }
        visited.commits.insert(oid);

        let stats = diff.stats()?;
        let when = commit.author().when();
        let date = Utc
            .timestamp_opt(when.seconds(), 0)
            .single()
            .ok_or_else(|| StoreError::InvalidInput(format!("commit {oid} has an invalid time")))?;
        history.push(HistoryEntry {
            commit_hash: oid.to_string(),
            date,
            message: commit.message().unwrap_or_default().trim_end().to_string(),
            added: stats.insertions(),
            deleted: stats.deletions(),
            file_path: owning_document(file),
        });

        let Some(blob) = arrived else {
            continue;
        };
        if let Some(origin) = rename_origin(&deletions, tracked, blob) {
            debug!(commit = %oid, from = %origin, to = %file, "following document lineage");
            history.extend(walk(repo, parent.id(), &origin, visited)?);
        }
    }

    Ok(history)
}

/// Path the tracked file was renamed from, among the commit's deletions:
/// same file name and blob, then same blob, then the last deletion.
fn rename_origin(deletions: &[(Oid, &Path)], tracked: &Path, blob: Oid) -> Option<String> {
    deletions
        .iter()
        .find(|(id, path)| *id == blob && path.file_name() == tracked.file_name())
        .or_else(|| deletions.iter().find(|(id, _)| *id == blob))
        .or_else(|| deletions.last())
        .and_then(|(_, path)| path.to_str())
        .map(str::to_string)
}

/// Title and content of the document at `doc_path` as of `commit_id`.
pub(crate) fn read_snapshot(
    repo: &Repository,
    doc_path: &str,
    commit_id: &str,
) -> Result<(String, String)> {
    let oid = Oid::from_str(commit_id)?;
    let commit = repo
        .find_commit(oid)
        .map_err(|e| StoreError::from_lookup(e, format!("commit {commit_id}")))?;
    let tree = commit.tree()?;
    let location = format!("{doc_path}@{commit_id}");
    let entry = tree
        .get_path(Path::new(&format!("{DOCS_DIR}/{doc_path}")))
        .map_err(|e| StoreError::from_lookup(e, location.clone()))?;
    if entry.kind() != Some(ObjectType::Tree) {
        return Err(StoreError::NotFound(location));
    }
    let node = repo.find_tree(entry.id())?;
    for item in node.iter() {
        if item.kind() != Some(ObjectType::Blob) {
            continue;
        }
        let Some(title) = item.name().and_then(|n| n.strip_suffix(".md")) else {
            continue;
        };
        let blob = repo.find_blob(item.id())?;
        return Ok((
            title.to_string(),
            String::from_utf8_lossy(blob.content()).into_owned(),
        ));
    }
    Err(StoreError::NotFound(location))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owning_document_strips_prefix_and_file() {
        assert_eq!(owning_document("docs/a/b/Title.md"), "a/b");
        assert_eq!(owning_document("docs/a/Title.md"), "a");
    }

    #[test]
    fn rename_origin_prefers_same_file_name_then_blob() {
        let empty = Oid::from_str("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391").unwrap();
        let edited = Oid::from_str("8ab686eafeb1f44702738c8b0f24f2567c36da6d").unwrap();
        let deletions = [
            (empty, Path::new("docs/guide/Guide.md")),
            (empty, Path::new("docs/guide/setup/Setup.md")),
        ];
        let origin = |tracked: &str, blob| rename_origin(&deletions, Path::new(tracked), blob);
        assert_eq!(origin("docs/handbook/setup/Setup.md", empty).as_deref(), Some("docs/guide/setup/Setup.md"));
        assert_eq!(origin("docs/handbook/Handbook.md", empty).as_deref(), Some("docs/guide/Guide.md"));
        assert_eq!(origin("docs/other/Other.md", edited).as_deref(), Some("docs/guide/setup/Setup.md"));
        assert_eq!(rename_origin(&[], Path::new("docs/a/A.md"), empty), None);
    }

    #[test]
    fn content_file_layout() {
        assert_eq!(content_file("a/b", "B"), "docs/a/b/B.md");
    }
}
