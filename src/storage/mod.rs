pub mod json_backend;

use crate::domain::book::Book;
use crate::errors::CoreError;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Abstraction over persistence backends capable of storing books.
pub trait StorageBackend: Send + Sync {
    fn save(&self, book: &Book, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<Book>;
    fn list(&self) -> Result<Vec<String>>;
    fn delete(&self, name: &str) -> Result<()>;
}

pub use json_backend::JsonStorage;
