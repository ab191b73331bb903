use std::path::Path;
use std::process::Command;

use log::{error, info};
use serde::Deserialize;

use super::{slug, Book, BookError, Page, TocEntry};

pub const DEFAULT_PDF_COMMAND: &str = "python scripts/py/pdf_extract.py";

#[derive(Debug, Deserialize)]
struct ExtractOutput {
    ok: bool,
    #[serde(default)]
    pages: Vec<Page>,
    #[serde(default)]
    meta: Option<ExtractMeta>,
    #[serde(default)]
    toc: Vec<TocEntry>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractMeta {
    #[serde(default)]
    title: Option<String>,
}

fn import_error(code: &str, message: impl Into<String>) -> BookError {
    BookError::Import {
        code: code.to_string(),
        message: message.into(),
    }
}

/// Runs the extraction command with the PDF path appended and builds a
/// book from the JSON it prints on stdout.
pub fn import_pdf(command: &[String], pdf_path: &Path) -> Result<Book, BookError> {
    if !pdf_path.exists() {
        return Err(import_error(
            "PDF_NOT_FOUND",
            format!("No se encontró {}", pdf_path.display()),
        ));
    }
    let (program, args) = command
        .split_first()
        .ok_or_else(|| import_error("PDF_SCRIPT_FAIL", "comando de extracción vacío"))?;

    let output = Command::new(program)
        .args(args)
        .arg(pdf_path)
        .output()
        .map_err(|err| {
            error!("Could not run PDF extractor {program}: {err}");
            import_error("PDF_SCRIPT_FAIL", err.to_string())
        })?;

    if !output.status.success() {
        let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("PDF extractor failed: {message}");
        return Err(import_error("PDF_SCRIPT_FAIL", message));
    }

    let parsed: ExtractOutput = serde_json::from_slice(&output.stdout)
        .map_err(|err| import_error("PDF_PARSE_FAIL", err.to_string()))?;
    if !parsed.ok {
        return Err(import_error(
            parsed.code.as_deref().unwrap_or("PDF_PARSE_FAIL"),
            parsed
                .message
                .unwrap_or_else(|| "Fallo al importar PDF".to_string()),
        ));
    }

    let stem = pdf_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "libro".to_string());
    let title = parsed
        .meta
        .and_then(|meta| meta.title)
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(stem);
    let pages: Vec<Page> = parsed
        .pages
        .into_iter()
        .filter(|page| !page.content.trim().is_empty())
        .collect();
    if pages.is_empty() {
        return Err(BookError::Empty);
    }

    info!("Imported PDF \"{title}\" with {} pages", pages.len());
    let mut book = Book::new(slug(&title), title, pages);
    book.toc = parsed.toc;
    Ok(book)
}
