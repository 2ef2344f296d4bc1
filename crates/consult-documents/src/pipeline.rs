//! Upload validation and the document-context pipeline (§4.9, §5 "Document
//! uploads write to `data/uploads/<session_id>/`"). Grounded on the original
//! upload route's extension/MIME/size/collision checks.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use consult_core::error::{ConsultError, Result};
use consult_extraction::ChatLlm;
use consult_store::DocumentContext;

use crate::analyzer::DocumentAnalyzer;
use crate::parser::{DocumentParser, ParsedDocument};

pub const MAX_FILES_PER_SESSION: usize = 5;
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const MAX_FILENAME_COLLISION_RETRIES: u32 = 100;

/// One file as received over HTTP, before it touches disk.
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

fn supported_extensions() -> &'static [&'static str] {
    &["pdf", "docx", "xlsx", "xls", "txt", "md"]
}

fn allowed_mimes(ext: &str) -> &'static [&'static str] {
    match ext {
        "pdf" => &["application/pdf"],
        "docx" => &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
        "xlsx" => &["application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"],
        "xls" => &["application/vnd.ms-excel"],
        "txt" => &["text/plain"],
        "md" => &["text/plain", "text/markdown"],
        _ => &[],
    }
}

fn validate_upload_batch(existing_count: usize, incoming: &[UploadedFile]) -> Result<()> {
    if incoming.len() > MAX_FILES_PER_SESSION {
        return Err(ConsultError::InvalidInput(format!("maximum {MAX_FILES_PER_SESSION} files per session")));
    }
    if existing_count + incoming.len() > MAX_FILES_PER_SESSION {
        return Err(ConsultError::InvalidInput(format!(
            "maximum {MAX_FILES_PER_SESSION} files per session (already have {existing_count})"
        )));
    }
    for file in incoming {
        let ext = extension_of(&file.filename);
        if !supported_extensions().contains(&ext.as_str()) {
            return Err(ConsultError::InvalidInput(format!("unsupported file type: .{ext}")));
        }
        let allowed = allowed_mimes(&ext);
        if let Some(ct) = &file.content_type {
            if !allowed.is_empty() && !allowed.contains(&ct.as_str()) && ct != "application/octet-stream" {
                return Err(ConsultError::InvalidInput(format!("MIME type '{ct}' not allowed for .{ext}")));
            }
        }
        if file.bytes.len() > MAX_FILE_SIZE {
            return Err(ConsultError::InvalidInput(format!(
                "file {} exceeds {}MB limit",
                file.filename,
                MAX_FILE_SIZE / (1024 * 1024)
            )));
        }
    }
    Ok(())
}

fn extension_of(filename: &str) -> String {
    Path::new(filename).extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase()
}

/// Strip directory components and refuse dotfile-only names, mirroring the
/// original's path-traversal guard.
fn sanitize_filename(filename: &str, index: usize, ext: &str) -> String {
    let base = Path::new(filename).file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    if base.is_empty() || base.starts_with('.') {
        format!("upload_{index}.{ext}")
    } else {
        base
    }
}

/// Resolve filename collisions within a session's upload directory with a
/// bounded suffix counter (§5).
fn resolve_collision(dir: &Path, filename: &str) -> Result<PathBuf> {
    let mut path = dir.join(filename);
    if !path.exists() {
        return Ok(path);
    }
    let stem = Path::new(filename).file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let suffix = Path::new(filename).extension().map(|s| format!(".{}", s.to_string_lossy())).unwrap_or_default();
    let mut counter = 1;
    while path.exists() && counter < MAX_FILENAME_COLLISION_RETRIES {
        path = dir.join(format!("{stem}_{counter}{suffix}"));
        counter += 1;
    }
    if path.exists() {
        return Err(ConsultError::InvalidInput("too many filename collisions".to_string()));
    }
    Ok(path)
}

/// Validates, persists, parses, and analyzes one upload batch, returning the
/// resulting [`DocumentContext`] ready for `SessionStore::update_document_context`.
pub async fn process_upload<L: ChatLlm>(
    upload_root: &Path,
    session_id: &str,
    files: Vec<UploadedFile>,
    parser: &dyn DocumentParser,
    analyzer: &DocumentAnalyzer<L>,
) -> Result<DocumentContext> {
    let session_dir = upload_root.join(session_id);
    tokio::fs::create_dir_all(&session_dir).await.map_err(ConsultError::Io)?;

    let existing = std::fs::read_dir(&session_dir).map(|rd| rd.count()).unwrap_or(0);
    validate_upload_batch(existing, &files)?;

    let mut parsed_docs: Vec<ParsedDocument> = Vec::new();
    for (index, file) in files.into_iter().enumerate() {
        let ext = extension_of(&file.filename);
        let safe_name = sanitize_filename(&file.filename, index, &ext);
        let path = resolve_collision(&session_dir, &safe_name)?;
        tokio::fs::write(&path, &file.bytes).await.map_err(ConsultError::Io)?;

        match parser.parse(&path).await {
            Some(doc) => {
                info!(filename = %file.filename, chunks = doc.chunks.len(), "document parsed");
                parsed_docs.push(doc);
            }
            None => warn!(filename = %file.filename, "document parse failed"),
        }
    }

    if parsed_docs.is_empty() {
        return Err(ConsultError::InvalidInput("no documents could be parsed".to_string()));
    }

    Ok(analyzer.analyze(&parsed_docs).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consult_extraction::ChatMessage;

    struct StubLlm;
    #[async_trait]
    impl ChatLlm for StubLlm {
        async fn chat(&self, _m: &[ChatMessage], _t: f32, _mt: u32) -> Result<String> {
            Ok(r#"{"summary": "ok"}"#.to_string())
        }
    }

    #[test]
    fn rejects_unsupported_extension() {
        let files = vec![UploadedFile { filename: "virus.exe".to_string(), content_type: None, bytes: vec![1, 2, 3] }];
        assert!(validate_upload_batch(0, &files).is_err());
    }

    #[test]
    fn rejects_oversized_file() {
        let files = vec![UploadedFile {
            filename: "big.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: vec![0u8; MAX_FILE_SIZE + 1],
        }];
        assert!(validate_upload_batch(0, &files).is_err());
    }

    #[test]
    fn rejects_batch_exceeding_session_total() {
        let files: Vec<UploadedFile> = (0..2)
            .map(|i| UploadedFile { filename: format!("f{i}.txt"), content_type: None, bytes: vec![0] })
            .collect();
        assert!(validate_upload_batch(MAX_FILES_PER_SESSION - 1, &files).is_err());
    }

    #[test]
    fn sanitize_filename_rejects_dotfiles() {
        assert_eq!(sanitize_filename(".hidden", 0, "txt"), "upload_0.txt");
        assert_eq!(sanitize_filename("../../etc/passwd.txt", 0, "txt"), "passwd.txt");
    }

    #[tokio::test]
    async fn process_upload_parses_and_analyzes_a_text_file() {
        use crate::parser::FileDocumentParser;
        let dir = tempfile::tempdir().unwrap();

        let files = vec![UploadedFile {
            filename: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: b"hello world".to_vec(),
        }];
        let analyzer = DocumentAnalyzer::new(StubLlm);
        let result = process_upload(dir.path(), "sess-1", files, &FileDocumentParser, &analyzer).await.unwrap();
        assert_eq!(result.summary, "ok");
    }
}
