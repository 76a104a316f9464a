use crate::error::Result;
use crate::llm::TextModel;
use rig::completion::Message;
use std::sync::Arc;
use tracing::info;

const EXTRACTION_PREAMBLE: &str = "You are a helpful medical assistant. \
Extract only the symptoms from the user's input. \
Return symptoms exactly as found in the text.";

const EXAMPLES: [(&str, &str); 2] = [
    (
        "I have been facing headache and nausea since morning.",
        "headache, nausea",
    ),
    (
        "Lately I am experiencing chest pain and shortness of breath.",
        "chest pain, shortness of breath",
    ),
];

/// Pulls a comma-separated symptom list out of free text.
pub struct SymptomExtractor {
    model: Arc<dyn TextModel>,
}

impl SymptomExtractor {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Returns the model's completion verbatim.
    pub async fn extract(&self, text: &str) -> Result<String> {
        info!("Extracting symptoms from {} characters of input", text.len());

        let response = self
            .model
            .chat(EXTRACTION_PREAMBLE, few_shot_history(), text)
            .await?;

        info!("Extracted symptoms: {}", response);
        Ok(response)
    }
}

fn few_shot_history() -> Vec<Message> {
    EXAMPLES
        .iter()
        .flat_map(|(input, output)| [Message::user(*input), Message::assistant(*output)])
        .collect()
}
