//! Reading source documents from disk.
//!
//! Plain text and Markdown are decoded as UTF-8, falling back to a detected
//! legacy encoding. PDFs are reduced to their extractable text, one page per
//! paragraph.

use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{IngestError, Result};

/// Extensions accepted for a single file.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "text", "md"];

/// Extensions picked up when ingesting a directory.
pub const DIRECTORY_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// A loaded document ready for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Provenance recorded on every fragment of this document.
    pub source_id: String,

    /// Extracted text.
    pub text: String,
}

/// Loads supported files into [`Document`]s.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load one file, dispatching on its extension.
    pub async fn load_file(path: &Path) -> Result<Document> {
        let extension = extension_of(path);
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(IngestError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            });
        }

        let bytes = tokio::fs::read(path).await?;
        let text = if extension == "pdf" {
            extract_pdf_text(path, &bytes)?
        } else {
            decode_text(&bytes)
        };

        debug!("Loaded {} ({} chars)", path.display(), text.chars().count());

        Ok(Document {
            source_id: path.display().to_string(),
            text,
        })
    }

    /// List the immediate `.pdf`, `.txt` and `.md` files of `dir`, sorted.
    ///
    /// Subdirectories are not descended into.
    pub fn collect_directory(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {e}", dir.display());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            if DIRECTORY_EXTENSIONS.contains(&extension_of(&path).as_str()) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Decode bytes as UTF-8, or as the most likely legacy encoding.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    debug!("Decoding non-UTF-8 text as {}", encoding.name());

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn extract_pdf_text(path: &Path, bytes: &[u8]) -> Result<String> {
    let pdf_error = |e: lopdf::Error| IngestError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let document = lopdf::Document::load_mem(bytes).map_err(pdf_error)?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => warn!(
                "No text extracted from page {page_number} of {}: {e}",
                path.display()
            ),
        }
    }

    Ok(pages.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_simple_pdf(path: &Path, pages: &[&str]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{Object, Stream, dictionary};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_load_utf8_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "\u{FEFF}# Notes\n\nCafé opens at nine.").unwrap();

        let doc = DocumentLoader::load_file(&path).await.unwrap();

        assert_eq!(doc.text, "# Notes\n\nCafé opens at nine.");
        assert_eq!(doc.source_id, path.display().to_string());
    }

    #[tokio::test]
    async fn test_load_legacy_encoding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lettre.txt");
        let original = "Le café est très chaud ce matin. L'élève arrive à l'école \
            après la récréation, et le maître lui répète la leçon déjà étudiée. \
            Noël approche, les fenêtres sont décorées et la forêt est gelée.";
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(original);
        assert!(std::str::from_utf8(&bytes).is_err());
        std::fs::write(&path, &bytes).unwrap();

        let doc = DocumentLoader::load_file(&path).await.unwrap();

        assert_eq!(doc.text, original);
    }

    #[tokio::test]
    async fn test_load_pdf_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.pdf");
        write_simple_pdf(&path, &["First page text", "Second page text"]);

        let doc = DocumentLoader::load_file(&path).await.unwrap();

        assert!(doc.text.contains("First page text"));
        assert!(doc.text.contains("Second page text"));
        assert!(doc.text.contains("\n\n"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let err = DocumentLoader::load_file(&path).await.unwrap_err();

        assert!(matches!(err, IngestError::Pdf { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.CSV");
        std::fs::write(&path, "a,b\n1,2").unwrap();

        let err = DocumentLoader::load_file(&path).await.unwrap_err();

        match err {
            IngestError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "csv"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_collect_directory_is_shallow_and_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("c.pdf"), "c").unwrap();
        std::fs::write(dir.path().join("d.text"), "d").unwrap();
        std::fs::write(dir.path().join("e.csv"), "e").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep.txt"), "deep").unwrap();

        let files = DocumentLoader::collect_directory(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name()?.to_str())
            .collect();

        assert_eq!(names, vec!["a.md", "b.txt", "c.pdf"]);
    }
}
