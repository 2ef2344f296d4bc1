//! Fallback anketa construction (§4.5). Used whenever the chat LLM call or
//! the JSON-repair pipeline fails outright — the coordinator must always
//! have a valid anketa to hand back, never a null.

use consult_anketa::Anketa;
use consult_store::DialogueTurn;

/// Build a minimal-but-valid anketa from whatever was already known: the
/// prior anketa's company/industry (if any) and any proposed-solution
/// fragments visible in the dialogue.
pub fn build_fallback_anketa(
    dialogue: &[DialogueTurn],
    prior: Option<&Anketa>,
    duration_seconds: f64,
) -> Anketa {
    let mut anketa = Anketa { consultation_duration_seconds: duration_seconds, ..Anketa::default() };

    if let Some(prior) = prior {
        anketa.company_name = prior.company_name.clone();
        anketa.industry = prior.industry.clone();
        anketa.specialization = prior.specialization.clone();
        anketa.contact_name = prior.contact_name.clone();
        anketa.agent_functions = prior.agent_functions.clone();
        anketa.additional_functions = prior.additional_functions.clone();
    }

    anketa.current_problems = extract_proposed_solution_fragments(dialogue);
    anketa
}

/// Scan assistant turns for lines that read like a proposed solution
/// ("I recommend...", "We suggest...") so at least some signal survives a
/// failed extraction.
fn extract_proposed_solution_fragments(dialogue: &[DialogueTurn]) -> Vec<String> {
    const MARKERS: &[&str] = &["I recommend", "I suggest", "We propose", "We recommend"];
    dialogue
        .iter()
        .filter(|t| t.role == "assistant")
        .flat_map(|t| t.content.split('.'))
        .map(str::trim)
        .filter(|line| MARKERS.iter().any(|m| line.starts_with(m)))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(5)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> DialogueTurn {
        DialogueTurn {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            phase: String::new(),
        }
    }

    #[test]
    fn fallback_is_never_null_and_carries_duration() {
        let anketa = build_fallback_anketa(&[], None, 42.0);
        assert_eq!(anketa.consultation_duration_seconds, 42.0);
    }

    #[test]
    fn fallback_copies_company_and_industry_from_prior() {
        let prior = Anketa { company_name: "Acme".to_string(), industry: "retail".to_string(), ..Anketa::default() };
        let anketa = build_fallback_anketa(&[], Some(&prior), 0.0);
        assert_eq!(anketa.company_name, "Acme");
        assert_eq!(anketa.industry, "retail");
    }

    #[test]
    fn fallback_copies_additional_functions_from_prior() {
        use consult_anketa::{AgentFunction, Priority};
        let prior = Anketa {
            additional_functions: vec![AgentFunction {
                name: "callback".to_string(),
                description: "schedule a callback".to_string(),
                priority: Priority::Medium,
            }],
            ..Anketa::default()
        };
        let anketa = build_fallback_anketa(&[], Some(&prior), 0.0);
        assert_eq!(anketa.additional_functions.len(), 1);
        assert_eq!(anketa.additional_functions[0].name, "callback");
    }

    #[test]
    fn fallback_surfaces_proposed_solution_fragments() {
        let dialogue = vec![turn("assistant", "I recommend a booking assistant. Let me know what you think.")];
        let anketa = build_fallback_anketa(&dialogue, None, 0.0);
        assert!(anketa.current_problems.iter().any(|p| p.contains("booking assistant")));
    }
}
