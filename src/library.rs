use chrono::{DateTime, Local};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::paginator::page_count;
use crate::session::Snapshot;
use crate::store::{progress_key, text_key, KvStore, TEXT_PREFIX};

/// A saved text as listed on the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub name: String,
    pub updated_at: Option<DateTime<Local>>,
    /// 1-based current page and page count, when progress was saved.
    pub progress: Option<(usize, usize)>,
}

impl TextEntry {
    pub fn progress_label(&self) -> String {
        match self.progress {
            Some((page, pages)) => format!("page {page}/{pages}"),
            None => "not started".to_string(),
        }
    }
}

/// Store a text body under `name`, replacing any earlier version.
pub fn import(store: &mut dyn KvStore, name: &str, text: &str) -> Result<()> {
    store.set(&text_key(name), text)?;
    debug!(name, "text imported");
    Ok(())
}

/// Import a file, keyed by its file name. Returns that name.
pub fn import_file(store: &mut dyn KvStore, path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)?.replace("\r\n", "\n");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    import(store, &name, &text)?;
    Ok(name)
}

pub fn load(store: &dyn KvStore, name: &str) -> Result<Option<String>> {
    store.get(&text_key(name))
}

/// Delete a text together with its progress.
pub fn remove(store: &mut dyn KvStore, name: &str) -> Result<()> {
    store.remove(&text_key(name))?;
    store.remove(&progress_key(name))?;
    debug!(name, "text removed");
    Ok(())
}

/// Every saved text, sorted by name.
pub fn entries(store: &dyn KvStore, page_size: usize) -> Result<Vec<TextEntry>> {
    let mut names: Vec<String> = store
        .list_keys()?
        .into_iter()
        .filter_map(|key| key.strip_prefix(TEXT_PREFIX).map(str::to_string))
        .collect();
    names.sort();

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let key = text_key(&name);
        let updated_at = store
            .updated_at(&progress_key(&name))?
            .or(store.updated_at(&key)?);

        let progress = match (Snapshot::restore(store, &name), store.get(&key)?) {
            (Some(snapshot), Some(text)) => {
                let pages = page_count(&text, page_size);
                (pages > 0).then(|| (snapshot.page.min(pages - 1) + 1, pages))
            }
            (None, Some(_)) => None,
            (_, None) => {
                warn!(name, "text vanished while listing");
                continue;
            }
        };

        entries.push(TextEntry {
            name,
            updated_at,
            progress,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::store::{MemoryStore, SqliteStore};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_import_and_load() {
        let mut store = MemoryStore::new();
        import(&mut store, "poem.txt", "roses are red").unwrap();
        assert_eq!(
            load(&store, "poem.txt").unwrap().as_deref(),
            Some("roses are red")
        );
        assert_eq!(load(&store, "other.txt").unwrap(), None);
    }

    #[test]
    fn test_entries_only_lists_texts() {
        let mut store = MemoryStore::new();
        import(&mut store, "b.txt", "bbbb").unwrap();
        import(&mut store, "a.txt", "aaaa").unwrap();
        store.set("progress_a.txt", r#"{"page": 1}"#).unwrap();
        store.set("unrelated", "x").unwrap();

        let listed = entries(&store, 2).unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(listed[0].progress, Some((2, 2)));
        assert_eq!(listed[0].progress_label(), "page 2/2");
        assert_eq!(listed[1].progress, None);
        assert_eq!(listed[1].progress_label(), "not started");
    }

    #[test]
    fn test_entries_reflect_session_progress() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        import(&mut store, "story.txt", "ABCDEF").unwrap();

        let mut session = Session::load(&store, "story.txt", "ABCDEF", 2).unwrap();
        for c in "ABCD".chars() {
            session.type_char(c);
        }
        session.persist(&mut store).unwrap();

        let listed = entries(&store, 2).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].progress, Some((3, 3)));
        assert!(listed[0].updated_at.is_some());
    }

    #[test]
    fn test_remove_deletes_text_and_progress() {
        let mut store = MemoryStore::new();
        import(&mut store, "a.txt", "aaaa").unwrap();
        store.set("progress_a.txt", "{}").unwrap();

        remove(&mut store, "a.txt").unwrap();
        assert!(store.list_keys().unwrap().is_empty());
    }

    #[test]
    fn test_import_file_uses_file_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chapter1.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "line one\r\nline two\n").unwrap();

        let mut store = MemoryStore::new();
        let name = import_file(&mut store, &path).unwrap();
        assert_eq!(name, "chapter1.txt");
        assert_eq!(
            load(&store, "chapter1.txt").unwrap().as_deref(),
            Some("line one\nline two\n")
        );
    }

    #[test]
    fn test_import_missing_file_is_io_error() {
        let mut store = MemoryStore::new();
        let err = import_file(&mut store, Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
