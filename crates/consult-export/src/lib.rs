pub mod filename;
pub mod html;
pub mod markdown;
pub mod renderer;

pub use filename::{content_disposition, export_filename, ExportFilename};
pub use html::render_print_html;
pub use markdown::render_markdown;
pub use renderer::MarkdownAnketaRenderer;
