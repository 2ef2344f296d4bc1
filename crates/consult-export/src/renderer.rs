//! Concrete [`consult_orchestrator::AnketaRenderer`] wiring the Markdown
//! renderer into the orchestrator's collaborator boundary (§4.6 step 5).

use consult_anketa::Anketa;
use consult_orchestrator::AnketaRenderer;

pub struct MarkdownAnketaRenderer {
    session_type: String,
}

impl MarkdownAnketaRenderer {
    pub fn new(session_type: impl Into<String>) -> Self {
        Self { session_type: session_type.into() }
    }
}

impl Default for MarkdownAnketaRenderer {
    fn default() -> Self {
        Self::new("consultation")
    }
}

impl AnketaRenderer for MarkdownAnketaRenderer {
    fn render_markdown(&self, anketa: &Anketa) -> String {
        crate::markdown::render_markdown(anketa, &self.session_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_through_the_orchestrator_boundary() {
        let renderer = MarkdownAnketaRenderer::default();
        let anketa = Anketa { company_name: "Acme".to_string(), ..Anketa::default() };
        let md = renderer.render_markdown(&anketa);
        assert!(md.contains("Acme"));
    }
}
