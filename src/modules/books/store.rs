//! File-backed catalogue.
//!
//! The whole catalogue is one JSON array. Every read reloads the file and
//! every append rewrites it in full; nothing is cached between calls.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use super::error::CatalogueError;
use super::models::Book;

pub struct CatalogueStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl CatalogueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty catalogue file if none exists yet.
    ///
    /// Returns `true` when a file was created.
    pub async fn ensure_exists(&self) -> Result<bool, CatalogueError> {
        let _guard = self.write_lock.lock().await;

        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|err| CatalogueError::storage(&self.path, err))?;
        if exists {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| CatalogueError::storage(&self.path, err))?;
        }

        self.write_all(&[]).await?;
        tracing::info!(path = %self.path.display(), "created empty catalogue");
        Ok(true)
    }

    /// Load the full catalogue in insertion order.
    pub async fn list_books(&self) -> Result<Vec<Book>, CatalogueError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|err| CatalogueError::storage(&self.path, err))?;

        serde_json::from_slice(&bytes).map_err(|err| CatalogueError::storage(&self.path, err))
    }

    /// Book at zero-based `index`.
    pub async fn get_book(&self, index: usize) -> Result<Book, CatalogueError> {
        let mut books = self.list_books().await?;
        let len = books.len();
        if index >= len {
            return Err(CatalogueError::NotFound { index, len });
        }
        Ok(books.swap_remove(index))
    }

    /// Append `book` as the last entry and return its index.
    ///
    /// Nothing is written when the existing catalogue cannot be read.
    pub async fn append_book(&self, book: Book) -> Result<usize, CatalogueError> {
        let _guard = self.write_lock.lock().await;

        let mut books = self.list_books().await?;
        books.push(book);
        self.write_all(&books).await?;

        let index = books.len() - 1;
        tracing::info!(
            path = %self.path.display(),
            index,
            name = %books[index].name,
            "book appended to catalogue"
        );
        Ok(index)
    }

    /// Replace the file contents through a temp file in the same directory.
    async fn write_all(&self, books: &[Book]) -> Result<(), CatalogueError> {
        let payload =
            to_pretty_json(books).map_err(|err| CatalogueError::storage(&self.path, err))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || persist_atomically(&path, &payload))
            .await
            .map_err(|err| CatalogueError::storage(&self.path, err))?
            .map_err(|err| CatalogueError::storage(&self.path, err))
    }
}

/// Write `payload` to a uniquely named temp file beside `path`, then move it
/// over `path`. The temp file is removed if anything fails.
fn persist_atomically(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(payload)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// JSON with four-space indentation; non-ASCII text is written verbatim.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn book(name: &str) -> Book {
        Book {
            name: name.to_string(),
            description: "desc".to_string(),
            rating: "7".to_string(),
            genre: "novel".to_string(),
            authors: vec!["A".to_string(), "B".to_string()],
            poster: format!("http://covers/{name}.jpg"),
        }
    }

    async fn empty_store() -> (TempDir, CatalogueStore) {
        let dir = TempDir::new().unwrap();
        let store = CatalogueStore::new(dir.path().join("data.json"));
        assert!(store.ensure_exists().await.unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn appended_book_is_listed_last() {
        let (_dir, store) = empty_store().await;
        store.append_book(book("first")).await.unwrap();

        let index = store.append_book(book("Кобзар")).await.unwrap();
        let books = store.list_books().await.unwrap();

        assert_eq!(index, 1);
        assert_eq!(books.last(), Some(&book("Кобзар")));
    }

    #[tokio::test]
    async fn sequential_appends_keep_order() {
        let (_dir, store) = empty_store().await;
        store.append_book(book("seed")).await.unwrap();
        let before = store.list_books().await.unwrap().len();

        for name in ["one", "two", "three"] {
            store.append_book(book(name)).await.unwrap();
        }

        let names: Vec<String> = store
            .list_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names.len(), before + 3);
        assert_eq!(names, vec!["seed", "one", "two", "three"]);
    }

    #[tokio::test]
    async fn get_book_out_of_range_is_not_found() {
        let (_dir, store) = empty_store().await;
        store.append_book(book("only")).await.unwrap();

        assert_eq!(store.get_book(0).await.unwrap().name, "only");
        assert!(matches!(
            store.get_book(1).await,
            Err(CatalogueError::NotFound { index: 1, len: 1 })
        ));
        assert!(matches!(
            store.get_book(usize::MAX).await,
            Err(CatalogueError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn append_to_unreadable_store_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = CatalogueStore::new(&path);

        let result = store.append_book(book("lost")).await;

        assert!(matches!(
            result,
            Err(CatalogueError::StorageUnavailable { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn missing_file_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = CatalogueStore::new(dir.path().join("absent.json"));

        assert!(matches!(
            store.list_books().await,
            Err(CatalogueError::StorageUnavailable { .. })
        ));
        assert!(matches!(
            store.append_book(book("x")).await,
            Err(CatalogueError::StorageUnavailable { .. })
        ));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn file_layout_uses_four_spaces_and_keeps_unicode() {
        let (_dir, store) = empty_store().await;
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");

        store.append_book(book("Ґ")).await.unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();

        assert!(raw.starts_with("[\n    {\n        \"name\": \"Ґ\","));
    }

    #[tokio::test]
    async fn writes_leave_no_temp_files_and_ignore_stale_siblings() {
        let (dir, store) = empty_store().await;
        let stale = dir.path().join("data.json.tmp");
        std::fs::write(&stale, "half-written").unwrap();

        store.append_book(book("one")).await.unwrap();
        store.append_book(book("two")).await.unwrap();

        let mut entries: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["data.json", "data.json.tmp"]);
        assert_eq!(std::fs::read_to_string(&stale).unwrap(), "half-written");
        assert_eq!(store.list_books().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn separate_stores_over_one_file_both_land() {
        let (dir, first) = empty_store().await;
        let second = CatalogueStore::new(dir.path().join("data.json"));

        first.append_book(book("server")).await.unwrap();
        second.append_book(book("terminal")).await.unwrap();

        let names: Vec<String> = first
            .list_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["server", "terminal"]);
    }

    #[tokio::test]
    async fn ensure_exists_leaves_existing_catalogue_alone() {
        let (_dir, store) = empty_store().await;
        store.append_book(book("kept")).await.unwrap();

        assert!(!store.ensure_exists().await.unwrap());
        assert_eq!(store.list_books().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let (_dir, store) = empty_store().await;
        let store = std::sync::Arc::new(store);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append_book(book(&format!("b{i}"))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.list_books().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn ensure_exists_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = CatalogueStore::new(dir.path().join("nested/shelf/data.json"));

        assert!(store.ensure_exists().await.unwrap());
        assert!(store.list_books().await.unwrap().is_empty());
    }
}
