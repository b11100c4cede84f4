//! Title to directory-name conversion.

use std::path::Path;

const RESERVED_ID: &str = "root";
const EMPTY_FALLBACK: &str = "untitled";

/// Transliterate a title to ASCII and reduce it to `[a-z0-9_]`.
pub fn slugify(title: &str) -> String {
    let slug: String = deunicode::deunicode(title)
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if slug.is_empty() {
        EMPTY_FALLBACK.to_string()
    } else {
        slug
    }
}

/// Pick an id for `title` that is free inside `parent_dir`.
///
/// `current` is the id the node already owns in that directory; it counts as
/// free so that renaming a node to a title with the same slug keeps its id.
pub fn generate_id(parent_dir: &Path, title: &str, current: Option<&str>) -> String {
    let base = slugify(title);
    let mut id = base.clone();
    let mut counter = 1;
    loop {
        if id != RESERVED_ID
            && (current == Some(id.as_str()) || !parent_dir.join(&id).exists())
        {
            return id;
        }
        id = format!("{base}({counter})");
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_and_lowercases() {
        assert_eq!(slugify("Hello World!"), "hello_world");
        assert_eq!(slugify("C++ & Rust"), "c__rust");
        assert_eq!(slugify("Привет мир"), "privet_mir");
        assert_eq!(slugify("!!!"), "untitled");
    }

    #[test]
    fn generate_id_resolves_collisions() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(generate_id(dir.path(), "Notes", None), "notes");
        std::fs::create_dir(dir.path().join("notes")).unwrap();
        assert_eq!(generate_id(dir.path(), "Notes", None), "notes(1)");
        std::fs::create_dir(dir.path().join("notes(1)")).unwrap();
        assert_eq!(generate_id(dir.path(), "notes", None), "notes(2)");
        assert_eq!(generate_id(dir.path(), "NOTES", Some("notes")), "notes");
    }

    #[test]
    fn root_is_reserved() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(generate_id(dir.path(), "Root", None), "root(1)");
    }
}
