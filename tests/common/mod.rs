//! Shared fixtures: small text PDFs generated with lopdf.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// A page with a heading, a four-row price table and a closing note.
/// Columns are separated by runs of spaces, as text-layer tables usually are.
pub const TABLE_PAGE: &[&str] = &[
    "Quarterly sales report",
    "Region  Sales  Units",
    "North  100  4",
    "South  80  3",
    "East  75  2",
    "West  60  1",
    "Figures are unaudited.",
];

/// A page of running prose: no line has two cells.
pub const PROSE_PAGE: &[&str] = &[
    "This page only holds prose.",
    "It has sentences with single spaces between words.",
    "Nothing here looks like a table.",
];

/// Build a document with one page per entry of `pages`, one text line per
/// string, in a monospaced base font.
fn build_test_pdf(pages: &[&[&str]]) -> Result<Document, Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for (index, line) in lines.iter().enumerate() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            if index + 1 < lines.len() {
                operations.push(Operation::new("T*", vec![]));
            }
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<Object>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Write the pages of [`build_test_pdf`] to `path`.
pub fn create_test_pdf(path: &Path, pages: &[&[&str]]) -> Result<(), Box<dyn std::error::Error>> {
    build_test_pdf(pages)?.save(path)?;
    Ok(())
}

/// Write the pages to `path` with a standard security handler in the
/// trailer. The keys match no password, so opening needs one and every
/// password is wrong.
pub fn create_encrypted_test_pdf(
    path: &Path,
    pages: &[&[&str]],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = build_test_pdf(pages)?;
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal(vec![1u8; 16]),
            Object::string_literal(vec![1u8; 16]),
        ],
    );
    doc.save(path)?;
    Ok(())
}

/// Generate `pages` into a fresh temp dir and return both (the dir must
/// outlive the test).
pub fn fixture(
    name: &str,
    pages: &[&[&str]],
) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(name);
    create_test_pdf(&path, pages).expect("write fixture pdf");
    (dir, path)
}
