use serde::Serialize;

use crate::store::DocumentChunk;

/// Fixed system policy sent ahead of every question, in order.
pub const SYSTEM_INSTRUCTIONS: [&str; 3] = [
    "You are a knowledgeable medical assistant. For any medical term or disease, include comprehensive information covering: \
definitions, types, historical background, major theories, known causes, and contributing risk factors. \
Explain the genesis or theories on its origin, if applicable. Use a structured, thorough approach and keep language accessible. \
provide symptoms, diagnosis, and treatment and post operative care , address all with indepth explanation , with specific details and step-by-step processes where relevant. \
If the context does not adequately cover the user's question, respond with: 'I cannot provide an answer based on the available medical dataset.'",
    "If the user asks for a medical explanation, ensure accuracy, don't include layman's terms if complex terms are used, \
and organize responses in a structured way.",
    "When comparing two terms or conditions, provide a clear, concise, and structured comparison. Highlight key differences in their \
definitions, symptoms, causes, diagnoses, and treatments with indepth explanation of each. If relevant, include any overlapping characteristics.",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// System policy followed by one user message carrying context and question.
pub fn build_prompt(question: &str, chunks: &[DocumentChunk]) -> Vec<Message> {
    let context = format_context(chunks);
    let mut messages: Vec<Message> = SYSTEM_INSTRUCTIONS
        .iter()
        .map(|s| Message::system(*s))
        .collect();
    messages.push(Message::user(user_message(&context, question)));
    messages
}

pub fn user_message(context: &str, question: &str) -> String {
    format!("{}\n\nQ: {}\nA:", context, question)
}

/// Chunk texts joined by newlines in retrieval order.
pub fn format_context(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
