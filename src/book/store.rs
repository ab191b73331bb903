use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use time::OffsetDateTime;

use super::{Book, BookError};

/// Saved books as `<id>.json` files in one directory.
pub struct BookStore {
    dir: PathBuf,
}

impl BookStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Writes the book, stamping `saved_at`.
    pub fn save(&self, book: &mut Book) -> Result<PathBuf, BookError> {
        fs::create_dir_all(&self.dir).map_err(|err| BookError::Io(self.dir.clone(), err))?;
        book.saved_at = Some(OffsetDateTime::now_utc().unix_timestamp());
        let path = self.path_for(&book.id);
        let json =
            serde_json::to_string_pretty(book).map_err(|err| BookError::Parse(path.clone(), err))?;
        fs::write(&path, json).map_err(|err| BookError::Io(path.clone(), err))?;
        info!("Saved book {} ({} pages)", book.id, book.pages.len());
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<Book, BookError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(BookError::NotFound(id.to_string()));
        }
        read_book(&path)
    }

    /// All readable books, sorted by title. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<Book>, BookError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|err| BookError::Io(self.dir.clone(), err))?;
        let mut books = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_book(&path) {
                Ok(book) => books.push(book),
                Err(err) => warn!("Skipping {}: {err}", path.display()),
            }
        }
        books.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(books)
    }

    pub fn delete(&self, id: &str) -> Result<(), BookError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(BookError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|err| BookError::Io(path.clone(), err))?;
        debug!("Deleted book {id}");
        Ok(())
    }
}

pub fn read_book(path: &Path) -> Result<Book, BookError> {
    let data = fs::read_to_string(path).map_err(|err| BookError::Io(path.to_path_buf(), err))?;
    let mut book: Book =
        serde_json::from_str(&data).map_err(|err| BookError::Parse(path.to_path_buf(), err))?;
    book.normalise();
    Ok(book)
}
