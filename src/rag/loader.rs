//! Text extraction for ingestible documents.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

/// Reads the text of a document.
///
/// PDFs are extracted page by page and joined with newlines; pages without
/// extractable text contribute an empty line. Everything else is read as
/// UTF-8 with invalid sequences dropped.
pub fn load_text(path: &Path) -> Result<String> {
    if has_extension(path, "pdf") {
        return load_pdf(path);
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).replace('\u{FFFD}', ""))
}

fn load_pdf(path: &Path) -> Result<String> {
    let document = lopdf::Document::load(path)
        .with_context(|| format!("Failed to open PDF {}", path.display()))?;
    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|&number| {
            document.extract_text(&[number]).unwrap_or_else(|e| {
                warn!(path = %path.display(), page = number, error = %e, "no text on page");
                String::new()
            })
        })
        .collect();
    Ok(pages.join("\n"))
}

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Writes a PDF with one page per entry; `None` pages have no content stream.
#[cfg(test)]
pub(crate) fn write_test_pdf(path: &Path, pages: &[Option<&str>]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        };
        if let Some(text) = text {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            page.set("Contents", content_id);
        }
        kids.push(doc.add_object(page).into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
