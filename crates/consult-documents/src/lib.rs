pub mod analyzer;
pub mod parser;
pub mod pipeline;

pub use analyzer::DocumentAnalyzer;
pub use parser::{DocumentParser, FileDocumentParser, ParsedDocument};
pub use pipeline::{process_upload, UploadedFile, MAX_FILES_PER_SESSION, MAX_FILE_SIZE};
