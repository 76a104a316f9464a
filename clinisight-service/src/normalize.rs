//! Turns a raw agent reply into a [`NormalizedResult`].
//!
//! Each message is decoded once into an [`AgentMessage`]; classification
//! only ever matches on [`MessageContent`].

use crate::models::NormalizedResult;
use serde_json::{Map, Value};

const CONTENT_FIELDS: [&str; 4] = ["content", "text", "output_text", "body"];

#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    TextChunks(Vec<Value>),
    StructuredPayload(Map<String, Value>),
    RawString(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentMessage {
    /// `type` or `role` tag, empty when neither is present.
    pub kind: String,
    pub content: MessageContent,
    pub tool_call_id: Option<String>,
    pub has_tool_calls: bool,
}

/// What a message contributes after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Tool(Value),
    Assistant(String),
    Nothing,
}

/// Python-style truthiness: null, false, zero and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

impl AgentMessage {
    pub fn decode(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self {
                kind: String::new(),
                content: MessageContent::Empty,
                tool_call_id: None,
                has_tool_calls: false,
            };
        };

        let kind = ["type", "role"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        let content = match CONTENT_FIELDS
            .iter()
            .find_map(|key| fields.get(*key).filter(|v| is_truthy(v)))
        {
            Some(Value::Array(chunks)) => MessageContent::TextChunks(chunks.clone()),
            Some(Value::Object(map)) => MessageContent::StructuredPayload(map.clone()),
            Some(Value::String(text)) => MessageContent::RawString(text.clone()),
            _ => MessageContent::Empty,
        };

        let tool_call_id = match fields.get("tool_call_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => Some(other.to_string()),
        };

        let has_tool_calls = fields
            .get("additional_kwargs")
            .and_then(|kwargs| kwargs.get("tool_calls"))
            .is_some_and(is_truthy);

        Self {
            kind,
            content,
            tool_call_id,
            has_tool_calls,
        }
    }

    fn carries_tool_markers(&self) -> bool {
        self.kind.to_lowercase().contains("tool") || self.tool_call_id.is_some() || self.has_tool_calls
    }
}

/// Returns `(is_tool_output, content)` for one message.
pub fn classify_and_extract(message: &AgentMessage) -> (bool, Option<Value>) {
    match &message.content {
        MessageContent::TextChunks(chunks) => {
            let parts: Vec<String> = chunks.iter().map(chunk_text).collect();
            (true, Some(Value::String(parts.join("\n"))))
        }
        MessageContent::StructuredPayload(map) => match map.get("output_text") {
            Some(output) => (true, Some(output.clone())),
            None => (true, Some(Value::Object(map.clone()))),
        },
        MessageContent::RawString(raw) => {
            let text = raw.trim();
            if let Some(parsed) = parse_embedded_json(text) {
                return (true, Some(parsed));
            }
            (
                message.carries_tool_markers(),
                Some(Value::String(text.to_string())),
            )
        }
        MessageContent::Empty => (false, None),
    }
}

fn chunk_text(chunk: &Value) -> String {
    match chunk {
        Value::Object(map) => match map.get("text") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => chunk.to_string(),
        },
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_embedded_json(text: &str) -> Option<Value> {
    if let Ok(parsed) = serde_json::from_str(text) {
        return Some(parsed);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

impl Extracted {
    pub fn from_message(message: &AgentMessage) -> Self {
        match classify_and_extract(message) {
            (true, Some(value)) => Self::Tool(value),
            (true, None) => Self::Tool(Value::Null),
            (false, Some(Value::String(text))) if !text.is_empty() => Self::Assistant(text),
            (false, Some(value)) if is_truthy(&value) => Self::Assistant(value.to_string()),
            (false, _) => Self::Nothing,
        }
    }
}

/// Normalizes `{"messages": [...]}` or a bare message array; any other
/// shape is passed through as assistant text.
pub fn normalize_reply(reply: &Value) -> NormalizedResult {
    let messages = match reply {
        Value::Object(map) => match map.get("messages") {
            Some(Value::Array(messages)) => messages,
            _ => return bypass(reply),
        },
        Value::Array(messages) => messages,
        _ => return bypass(reply),
    };

    let mut assistant_texts = Vec::new();
    let mut tool_outputs = Vec::new();

    for raw in messages {
        match Extracted::from_message(&AgentMessage::decode(raw)) {
            Extracted::Tool(value) => tool_outputs.push(value),
            Extracted::Assistant(text) => assistant_texts.push(text),
            Extracted::Nothing => {}
        }
    }

    NormalizedResult {
        assistant: (!assistant_texts.is_empty()).then(|| assistant_texts.join("\n\n")),
        primary_tool_output: tool_outputs.first().cloned(),
        tool_outputs,
    }
}

fn bypass(reply: &Value) -> NormalizedResult {
    let assistant = match reply {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    NormalizedResult {
        assistant: Some(assistant),
        tool_outputs: Vec::new(),
        primary_tool_output: None,
    }
}
