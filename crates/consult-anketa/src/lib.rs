pub mod cleaner;
pub mod json_repair;
pub mod types;

pub use types::{
    AgentFunction, AiRecommendation, Anketa, DialogueExample, DialogueRole, EscalationRule,
    FaqItem, Integration, InterviewAnketa, ObjectionHandler, Priority, Urgency,
};
