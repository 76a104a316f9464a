use crate::config::LlmConfig;
use crate::error::{ClinisightError, Result};
use async_trait::async_trait;
use rig::{
    client::CompletionClient,
    completion::{Chat, Message},
    providers::groq,
};
use tracing::debug;

/// Text-in, text-out access to a chat model.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Sends `prompt` as the final user turn after `history`.
    async fn chat(&self, preamble: &str, history: Vec<Message>, prompt: &str) -> Result<String>;

    async fn prompt(&self, preamble: &str, prompt: &str) -> Result<String> {
        self.chat(preamble, Vec::new(), prompt).await
    }
}

/// Groq-hosted model driven through a rig agent.
pub struct GroqTextModel {
    client: groq::Client,
    model: String,
    temperature: f64,
}

impl GroqTextModel {
    pub fn new(api_key: &str, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client: groq::Client::new(api_key),
            model: model.into(),
            temperature,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(&config.groq_api_key, config.task_model.clone(), config.task_temperature)
    }
}

#[async_trait]
impl TextModel for GroqTextModel {
    async fn chat(&self, preamble: &str, history: Vec<Message>, prompt: &str) -> Result<String> {
        debug!(model = %self.model, history_len = history.len(), "Sending chat request");

        let mut builder = self.client.agent(&self.model).temperature(self.temperature);
        // An empty preamble sends no system message.
        if !preamble.is_empty() {
            builder = builder.preamble(preamble);
        }
        let agent = builder.build();

        agent
            .chat(Message::user(prompt), history)
            .await
            .map_err(|e| ClinisightError::Llm(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records every prompt it receives.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        pub calls: Mutex<Vec<(String, usize, String)>>,
    }

    impl ScriptedModel {
        pub fn with_replies(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(_, _, p)| p.clone()).collect()
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn chat(&self, preamble: &str, history: Vec<Message>, prompt: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((preamble.to_string(), history.len(), prompt.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ClinisightError::Llm("no scripted reply left".to_string()))
        }
    }
}
