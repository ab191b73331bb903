use once_cell::sync::Lazy;
use regex::Regex;

use super::Page;

static PAGE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"==Start of OCR for page (\d+)==([\s\S]*?)==End of OCR for page \d+==")
        .expect("valid OCR marker regex")
});

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

const BIBLIOGRAPHIC: &[&str] = &[
    "isbn",
    "copyright",
    "derechos reservados",
    "all rights reserved",
    "impreso en",
    "printed in",
    "edición:",
    "editor:",
    "traducción:",
    "diseño:",
    "maquetación:",
    "www.",
    "http:",
    "https:",
    "depósito legal",
    "título original",
    "publicado por",
    "editorial",
    "email:",
    "fichas",
    "índice",
];

fn keep_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !BIBLIOGRAPHIC.iter().any(|keyword| lower.contains(keyword))
}

fn clean_page(raw: &str) -> String {
    let kept: Vec<&str> = raw.trim().lines().filter(|line| keep_line(line)).collect();
    BLANK_RUNS.replace_all(&kept.join("\n"), "\n\n").into_owned()
}

/// Splits OCR output delimited by `==Start of OCR for page N==` markers
/// into cleaned pages sorted by number. Pages left empty are dropped.
pub fn parse_book_content(raw: &str) -> Vec<Page> {
    let mut pages: Vec<Page> = PAGE_BLOCK
        .captures_iter(raw)
        .filter_map(|caps| {
            let page_number = caps[1].parse().ok()?;
            let content = clean_page(&caps[2]);
            (!content.is_empty()).then_some(Page {
                page_number,
                content,
            })
        })
        .collect();
    pages.sort_by_key(|page| page.page_number);
    pages
}

pub fn extract_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        current.push(line.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

/// OCR-marked text is split by marker; anything else becomes one page per
/// paragraph.
pub fn pages_from_text(text: &str) -> Vec<Page> {
    let marked = parse_book_content(text);
    if !marked.is_empty() {
        return marked;
    }
    extract_paragraphs(text)
        .into_iter()
        .zip(1..)
        .map(|(content, page_number)| Page {
            page_number,
            content,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_marked_pages_and_sorts() {
        let raw = "==Start of OCR for page 3==\nTercera\n==End of OCR for page 3==\n\
                   ==Start of OCR for page 1==\nPrimera\n==End of OCR for page 1==";
        let pages = parse_book_content(raw);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[1].content, "Tercera");
    }

    #[test]
    fn strips_page_numbers_and_bibliographic_lines() {
        let raw = "==Start of OCR for page 2==\nISBN 978-84\n12\nHabía una vez\n\nwww.editorial.com\nun lector\n==End of OCR for page 2==";
        let pages = parse_book_content(raw);
        assert_eq!(pages[0].content, "Había una vez\nun lector");
    }

    #[test]
    fn empty_pages_are_dropped() {
        let raw = "==Start of OCR for page 1==\nCopyright 2020\n7\n==End of OCR for page 1==";
        assert!(parse_book_content(raw).is_empty());
    }

    #[test]
    fn splits_paragraphs_on_blank_lines() {
        let text = "  Hola   mundo  \nLinea dos\n\n\n \t Otro parrafo \n";
        assert_eq!(
            extract_paragraphs(text),
            vec!["Hola mundo Linea dos", "Otro parrafo"]
        );
    }

    #[test]
    fn plain_text_becomes_paragraph_pages() {
        let pages = pages_from_text("Uno\n\nDos");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[1].content, "Dos");
    }
}
