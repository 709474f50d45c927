use crate::domain::entities::Reference;

pub const DEFAULT_PERSONA: &str = "You are a PostgreSQL database platform expert tasked with \
answering difficult user questions. You should defer to the following references in all \
respects, but are otherwise welcome to fill in gaps with your existing knowledge:";

pub const DEFAULT_CLOSING: &str = "Produce thorough and insightful answers whenever possible, \
and do not answer any questions unrelated to Postgres.";

/// ChatML prompt: a system section holding the persona and every reference,
/// then the user's question, then the assistant cue.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    persona: String,
    closing: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            closing: DEFAULT_CLOSING.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(persona: impl Into<String>, closing: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            closing: closing.into(),
        }
    }

    /// References are numbered from 1 in the order given.
    pub fn format_references(references: &[Reference]) -> String {
        references
            .iter()
            .enumerate()
            .map(|(i, reference)| {
                format!(
                    "Reference {} from {}\n\n{}\n\n",
                    i + 1,
                    reference.article_title,
                    reference.chunk_text
                )
            })
            .collect()
    }

    pub fn render(&self, question: &str, references: &[Reference]) -> String {
        format!(
            "<|im_start|>system\n{} \n\n{}\n\n{}\n<|im_end|>\n\n\
<|im_start|>user\n{}\n<|im_end|>\n\n\
<|im_start|>assistant\n",
            self.persona,
            Self::format_references(references),
            self.closing,
            question
        )
    }
}
