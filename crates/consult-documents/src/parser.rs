//! File-to-text parsing (§4.9). `DocumentParser` never raises: unreadable
//! or unsupported files come back as `None` and are logged by the caller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

const CHUNK_SIZE: usize = 2000;

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub filename: String,
    pub chunks: Vec<String>,
}

#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, path: &Path) -> Option<ParsedDocument>;
}

/// Extracts text from pdf/docx/xlsx/xls/txt/md files, grounded on the
/// extension-dispatch table the upload route validates against.
pub struct FileDocumentParser;

#[async_trait]
impl DocumentParser for FileDocumentParser {
    async fn parse(&self, path: &Path) -> Option<ParsedDocument> {
        let filename = path.file_name()?.to_string_lossy().to_string();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
        let owned = path.to_path_buf();

        let text = tokio::task::spawn_blocking(move || extract_text(&owned, &ext))
            .await
            .ok()
            .flatten();

        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                warn!(filename, "document produced no extractable text");
                return None;
            }
        };

        Some(ParsedDocument { filename, chunks: chunk_text(&text) })
    }
}

fn extract_text(path: &Path, ext: &str) -> Option<String> {
    match ext {
        "pdf" => pdf_extract::extract_text(path).ok(),
        "docx" => extract_docx(path),
        "xlsx" | "xls" => extract_spreadsheet(path),
        "txt" | "md" => std::fs::read_to_string(path).ok(),
        _ => None,
    }
}

fn extract_docx(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let docx = docx_rs::read_docx(&bytes).ok()?;
    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for pc in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = pc {
                    for rc in run.children {
                        if let docx_rs::RunChild::Text(t) = rc {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Some(text)
}

fn extract_spreadsheet(path: &PathBuf) -> Option<String> {
    use calamine::{open_workbook_auto, Reader};
    let mut workbook = open_workbook_auto(path).ok()?;
    let mut text = String::new();
    for sheet_name in workbook.sheet_names().to_owned() {
        if let Ok(range) = workbook.worksheet_range(&sheet_name) {
            for row in range.rows() {
                for cell in row {
                    text.push_str(&cell.to_string());
                    text.push(' ');
                }
                text.push('\n');
            }
        }
    }
    Some(text)
}

fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for paragraph in text.split("\n\n") {
        if current.len() + paragraph.len() > CHUNK_SIZE && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_splits_long_input_on_paragraph_boundaries() {
        let paragraph = "a".repeat(1500);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let chunks = chunk_text(&text);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn chunk_text_keeps_short_input_in_one_chunk() {
        let chunks = chunk_text("short document body");
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn parse_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.exe");
        std::fs::write(&path, b"binary junk").unwrap();
        let parsed = FileDocumentParser.parse(&path).await;
        assert!(parsed.is_none());
    }

    #[tokio::test]
    async fn parse_reads_plain_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello from a text document").unwrap();
        let parsed = FileDocumentParser.parse(&path).await.unwrap();
        assert_eq!(parsed.filename, "notes.txt");
        assert!(parsed.chunks[0].contains("hello"));
    }
}
