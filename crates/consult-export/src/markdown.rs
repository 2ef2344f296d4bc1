//! Canonical Markdown rendering of a completed anketa (§4.10), grounded on
//! the original anketa generator's table/list layout. Deterministic: the
//! same anketa always renders to the same bytes.

use consult_anketa::{Anketa, DialogueRole, Priority, Urgency};

const EMPTY_PLACEHOLDER: &str = "*Not specified*";

pub fn render_markdown(anketa: &Anketa, session_type: &str) -> String {
    let completion = anketa.completion_rate();
    let duration_min = anketa.consultation_duration_seconds / 60.0;
    let type_label = if session_type == "interview" { "Interview" } else { "Consultation" };

    let mut out = String::new();
    out.push_str(&format!("# Anketa: {}\n\n", display(&anketa.company_name)));
    out.push_str(&format!("**Session type:** {type_label}\n"));
    out.push_str(&format!("**Created:** {}\n", anketa.created_at));
    out.push_str(&format!("**Consultation duration:** {duration_min:.1} min\n"));
    out.push_str(&format!("**Completion rate:** {completion:.0}%\n\n---\n\n"));

    out.push_str("## 1. Identity\n\n");
    out.push_str(&render_table(&[
        ("Company", display(&anketa.company_name)),
        ("Industry", display(&anketa.industry)),
        ("Specialization", opt_display(&anketa.specialization)),
        ("Website", anketa.website.clone().unwrap_or_else(|| "—".to_string())),
        ("Contact name", opt_display(&anketa.contact_name)),
        ("Contact role", opt_display(&anketa.contact_role)),
        ("Contact phone", anketa.contact_phone.clone().unwrap_or_else(|| "—".to_string())),
    ]));

    out.push_str("\n## 2. Business context\n\n");
    out.push_str("### Description\n\n");
    out.push_str(&opt_block(&anketa.business_description));
    out.push_str("\n\n### Services\n\n");
    out.push_str(&render_list(&anketa.services));
    out.push_str("\n\n### Current problems\n\n");
    out.push_str(&render_list(&anketa.current_problems));
    out.push_str("\n\n### Business goals\n\n");
    out.push_str(&render_list(&anketa.business_goals));
    out.push_str("\n\n### Constraints\n\n");
    out.push_str(&render_list(&anketa.constraints));

    out.push_str("\n\n## 3. Voice-agent\n\n");
    out.push_str(&render_table(&[
        ("Agent name", opt_display(&anketa.agent_name)),
        ("Purpose", opt_display(&anketa.agent_purpose)),
        ("Voice", format!("{}, {}", anketa.voice_gender, anketa.voice_tone)),
        ("Language", anketa.language.clone()),
        ("Call direction", format_call_direction(&anketa.call_direction)),
    ]));
    out.push_str("\n### Functions\n\n");
    out.push_str(&render_functions(&anketa.agent_functions));
    out.push_str("\n\n### Additional functions\n\n");
    out.push_str(&render_functions(&anketa.additional_functions));
    out.push_str("\n\n### Typical questions\n\n");
    out.push_str(&render_list(&anketa.typical_questions));

    out.push_str("\n\n## 4. Integrations\n\n");
    out.push_str(&render_integrations(&anketa.integrations));

    out.push_str("\n\n## 5. FAQ\n\n");
    out.push_str(&render_faq(&anketa.faq));

    out.push_str("\n\n## 6. Objection handlers\n\n");
    out.push_str(&render_objections(&anketa.objection_handlers));

    out.push_str("\n\n## 7. Sample dialogue\n\n");
    out.push_str(&render_dialogue(&anketa.sample_dialogue));

    out.push_str("\n\n## 8. Financials\n\n");
    out.push_str(&render_list(&anketa.financial_metrics));

    out.push_str("\n\n## 9. Market analysis\n\n");
    out.push_str("### Competitors\n\n");
    out.push_str(&render_list(&anketa.competitors));
    out.push_str("\n\n### Market insights\n\n");
    out.push_str(&render_list(&anketa.market_insights));

    out.push_str("\n\n## 10. Segments\n\n");
    out.push_str(&render_list(&anketa.client_types));

    out.push_str("\n\n## 11. Escalation\n\n");
    out.push_str(&render_escalation(&anketa.escalation_rules));

    out.push_str("\n\n## 12. KPIs\n\n");
    out.push_str(&render_list(&anketa.kpis));

    out.push_str("\n\n## 13. Launch checklist\n\n");
    out.push_str(&render_list(&anketa.launch_checklist));

    out.push_str("\n\n## 14. AI recommendations\n\n");
    out.push_str(&render_recommendations(&anketa.recommendations));

    out.push_str("\n\n## 15. Tone of voice\n\n");
    out.push_str(&format!("Voice **{}**, tone **{}**, language **{}**.\n", anketa.voice_gender, anketa.voice_tone, anketa.language));

    out.push_str("\n## 16. Error scripts\n\n");
    out.push_str(EMPTY_PLACEHOLDER);

    out.push_str("\n\n## 17. Follow-up sequence\n\n");
    out.push_str(EMPTY_PLACEHOLDER);

    out.push_str("\n\n---\n\n*Generated automatically.*\n");
    out
}

fn display(s: &str) -> String {
    if s.is_empty() {
        "—".to_string()
    } else {
        s.to_string()
    }
}

fn opt_display(s: &str) -> String {
    display(s)
}

fn opt_block(s: &str) -> String {
    if s.is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        s.to_string()
    }
}

fn render_table(rows: &[(&str, String)]) -> String {
    let mut out = String::from("| Field | Value |\n|-------|-------|\n");
    for (label, value) in rows {
        out.push_str(&format!("| {label} | {value} |\n"));
    }
    out
}

fn render_list(items: &[String]) -> String {
    let non_empty: Vec<&String> = items.iter().filter(|s| !s.is_empty()).collect();
    if non_empty.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    non_empty.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")
}

fn render_functions(functions: &[consult_anketa::AgentFunction]) -> String {
    if functions.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    functions
        .iter()
        .enumerate()
        .map(|(i, f)| format!("### {}. {}\n\n{}\n\n*Priority: {}*", i + 1, f.name, f.description, priority_label(f.priority)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn priority_label(p: Priority) -> &'static str {
    match p {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

fn render_integrations(integrations: &[consult_anketa::Integration]) -> String {
    if integrations.is_empty() {
        return "*No integrations required*".to_string();
    }
    let mut out = String::from("| System | Purpose | Required |\n|--------|---------|----------|\n");
    for i in integrations {
        out.push_str(&format!("| {} | {} | {} |\n", i.name, i.purpose, if i.required { "Yes" } else { "No" }));
    }
    out
}

fn render_faq(items: &[consult_anketa::FaqItem]) -> String {
    if items.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    items.iter().map(|f| format!("**Q: {}**\nA: {}", f.question, f.answer)).collect::<Vec<_>>().join("\n\n")
}

fn render_objections(items: &[consult_anketa::ObjectionHandler]) -> String {
    if items.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    items
        .iter()
        .map(|o| format!("**Objection:** {}\n\n**Response:** {}", o.objection, o.response))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_dialogue(turns: &[consult_anketa::DialogueExample]) -> String {
    if turns.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    turns
        .iter()
        .map(|t| {
            let speaker = match t.role {
                DialogueRole::Bot => "Agent",
                DialogueRole::Client => "Client",
            };
            format!("> **{speaker}:** {}", t.message)
        })
        .collect::<Vec<_>>()
        .join("\n>\n")
}

fn render_escalation(rules: &[consult_anketa::EscalationRule]) -> String {
    if rules.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    let mut out = String::from("| Trigger | Urgency | Action |\n|---------|---------|--------|\n");
    for r in rules {
        let urgency = match r.urgency {
            Urgency::Immediate => "immediate",
            Urgency::Hour => "within an hour",
            Urgency::Day => "within a day",
        };
        out.push_str(&format!("| {} | {} | {} |\n", r.trigger, urgency, r.action));
    }
    out
}

fn render_recommendations(recs: &[consult_anketa::AiRecommendation]) -> String {
    if recs.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    recs.iter()
        .map(|r| format!("- **{}** (impact: {}, effort: {}, priority: {})", r.recommendation, r.impact, r.effort, priority_label(r.priority)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_call_direction(direction: &str) -> String {
    match direction {
        "inbound" => "Inbound",
        "outbound" => "Outbound",
        "both" => "Inbound and outbound",
        other => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_anketa() -> Anketa {
        Anketa::default()
    }

    #[test]
    fn empty_sections_render_placeholder() {
        let md = render_markdown(&empty_anketa(), "consultation");
        assert!(md.contains(EMPTY_PLACEHOLDER));
        assert!(md.contains("## 16. Error scripts"));
        assert!(md.contains("## 17. Follow-up sequence"));
    }

    #[test]
    fn populated_fields_render_their_values() {
        let anketa = Anketa {
            company_name: "Acme".to_string(),
            industry: "retail".to_string(),
            services: vec!["support".to_string()],
            ..empty_anketa()
        };
        let md = render_markdown(&anketa, "consultation");
        assert!(md.contains("Acme"));
        assert!(md.contains("- support"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let anketa = empty_anketa();
        assert_eq!(render_markdown(&anketa, "consultation"), render_markdown(&anketa, "consultation"));
    }
}
