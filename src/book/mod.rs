//! Books as the reader sees them: ordered pages plus an optional table of
//! contents. Only `page_number` and `content` drive playback.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod ocr;
pub mod pdf;
pub mod store;

pub use ocr::parse_book_content;
pub use pdf::import_pdf;
pub use store::BookStore;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("no se pudo leer {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("JSON inválido en {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
    #[error("no se encontró el libro {0}")]
    NotFound(String),
    #[error("el libro no tiene páginas con texto")]
    Empty,
    #[error("fallo al importar PDF ({code}): {message}")]
    Import { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_number: u32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    pub title: String,
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
    #[serde(default)]
    pub saved_at: Option<i64>,
}

impl Book {
    /// Builds a book with pages sorted by number and duplicates dropped.
    pub fn new(id: impl Into<String>, title: impl Into<String>, pages: Vec<Page>) -> Self {
        let mut book = Self {
            id: id.into(),
            title: title.into(),
            pages,
            toc: Vec::new(),
            saved_at: None,
        };
        book.normalise();
        book
    }

    /// Sorts pages by number, keeping the first of any duplicates. Page
    /// lookup and paging rely on this order.
    pub fn normalise(&mut self) {
        self.pages.sort_by_key(|page| page.page_number);
        self.pages.dedup_by_key(|page| page.page_number);
    }

    pub fn page(&self, page_number: u32) -> Option<&Page> {
        self.pages
            .binary_search_by_key(&page_number, |page| page.page_number)
            .ok()
            .map(|index| &self.pages[index])
    }
}

/// Turns a title or file stem into a store id.
pub fn slug(title: &str) -> String {
    let mut slug = String::new();
    for ch in title.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "libro".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, content: &str) -> Page {
        Page {
            page_number: number,
            content: content.into(),
        }
    }

    #[test]
    fn pages_are_sorted_and_unique() {
        let book = Book::new("b", "B", vec![page(3, "c"), page(1, "a"), page(3, "x")]);
        let numbers: Vec<u32> = book.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(book.page(3).map(|p| p.content.as_str()), Some("c"));
        assert!(book.page(2).is_none());
    }

    #[test]
    fn deserializes_camel_case_records() {
        let json = r#"{"id":"x","title":"X","pages":[{"pageNumber":2,"content":"Hola"}],"toc":[{"title":"Uno","pageNumber":2}]}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.pages[0].page_number, 2);
        assert_eq!(book.toc[0].section, None);
        assert_eq!(book.saved_at, None);
    }

    #[test]
    fn slugs_titles() {
        assert_eq!(slug("  El Principito: Edición!  "), "el-principito-edición");
        assert_eq!(slug("???"), "libro");
    }
}
