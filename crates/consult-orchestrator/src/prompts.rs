//! System-instruction text assembly for the live LLM context (§4.6 steps 3
//! and 5), grounded on the original voice consultant's
//! `get_system_prompt`/`get_enriched_system_prompt`/`get_review_system_prompt`
//! trio. Prompt bodies here are placeholders for the YAML-driven prompt
//! files the original loaded at runtime — out of scope per spec.md §1 ("YAML
//! prompt files" is an external collaborator concern) — but the assembly
//! logic (concatenation, voice read-back formatting) is in scope.

use consult_anketa::Anketa;

pub const BASE_CONSULTANT_PROMPT: &str = "You are a voice consultant conducting a structured \
business discovery call. Ask about the caller's company, services, and automation goals. Keep \
turns short and conversational.";

/// Concatenate the base prompt with a knowledge-base enrichment blob (§4.6
/// step 3). Returns the base prompt unchanged when enrichment is empty.
pub fn build_enriched_prompt(base_prompt: &str, enrichment: &str) -> String {
    if enrichment.trim().is_empty() {
        return base_prompt.to_string();
    }
    format!("{base_prompt}\n\n### Industry context:\n{enrichment}")
}

/// Build the review-phase system prompt: the current anketa read back to
/// the caller for confirmation (§4.6 step 5, "Review phase" in GLOSSARY).
pub fn build_review_prompt(anketa_summary: &str) -> String {
    format!(
        "The discovery phase is complete. Read the following summary back to the caller and ask \
them to confirm or correct it before ending the call:\n\n{anketa_summary}"
    )
}

/// Format an anketa as a numbered, human-readable summary suitable for a
/// realtime voice read-back. Skips empty sections.
pub fn format_anketa_for_voice(anketa: &Anketa) -> String {
    let mut sections: Vec<(&str, String)> = Vec::new();

    if !anketa.company_name.is_empty() {
        sections.push(("Company name", anketa.company_name.clone()));
    }
    if !anketa.contact_name.is_empty() {
        sections.push(("Contact", anketa.contact_name.clone()));
    }
    if !anketa.industry.is_empty() {
        sections.push(("Industry", anketa.industry.clone()));
    }
    if !anketa.services.is_empty() {
        sections.push(("Services", anketa.services.join(", ")));
    }
    if !anketa.current_problems.is_empty() {
        sections.push(("Current problems", anketa.current_problems.join(", ")));
    }
    if !anketa.agent_functions.is_empty() {
        let names: Vec<&str> = anketa.agent_functions.iter().map(|f| f.name.as_str()).collect();
        sections.push(("Proposed agent tasks", names.join(", ")));
    }
    if !anketa.integrations.is_empty() {
        let names: Vec<&str> = anketa.integrations.iter().map(|i| i.name.as_str()).collect();
        sections.push(("Integrations", names.join(", ")));
    }

    if sections.is_empty() {
        return "(the questionnaire is still empty)".to_string();
    }

    sections
        .into_iter()
        .enumerate()
        .map(|(i, (label, value))| format!("{}. {label}: {value}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enriched_prompt_concatenates_when_present() {
        let prompt = build_enriched_prompt("base", "retail tips");
        assert!(prompt.contains("base"));
        assert!(prompt.contains("retail tips"));
    }

    #[test]
    fn enriched_prompt_falls_back_to_base_when_empty() {
        assert_eq!(build_enriched_prompt("base", ""), "base");
    }

    #[test]
    fn voice_summary_skips_empty_sections() {
        let anketa = Anketa { company_name: "Acme".to_string(), ..Anketa::default() };
        let summary = format_anketa_for_voice(&anketa);
        assert!(summary.contains("Acme"));
        assert!(!summary.contains("Industry"));
    }

    #[test]
    fn empty_anketa_yields_placeholder() {
        let summary = format_anketa_for_voice(&Anketa::default());
        assert_eq!(summary, "(the questionnaire is still empty)");
    }
}
