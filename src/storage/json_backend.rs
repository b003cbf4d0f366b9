//! JSON file persistence for books.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::book::Book;
use crate::errors::CoreError;

use super::{Result, StorageBackend};

const BOOK_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// Stores each book as a pretty-printed JSON file under a root directory.
/// Writes go to a temp file first and are renamed into place so a failed
/// write never corrupts the previous snapshot.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn book_path(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", canonical_name(name), BOOK_EXTENSION))
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut tmp = path.to_path_buf();
        let ext = match path.extension().and_then(|ext| ext.to_str()) {
            Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
            None => String::from(TMP_SUFFIX),
        };
        tmp.set_extension(ext);
        tmp
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, book: &Book, name: &str) -> Result<()> {
        let path = self.book_path(name);
        let data = serde_json::to_string_pretty(book)?;
        let tmp = Self::tmp_path(&path);
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(book = %book.id, path = %path.display(), "saved book");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Book> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(CoreError::Storage(format!("book `{name}` not found")));
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(BOOK_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(CoreError::Storage(format!("book `{name}` not found")));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

fn canonical_name(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
