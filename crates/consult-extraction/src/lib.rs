pub mod extractor;
pub mod fallback;
pub mod llm;
pub mod prompt;

pub use extractor::ExtractionCoordinator;
pub use llm::{ChatLlm, ChatMessage, HttpChatLlm};
