use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInput {
    pub description: String,
}

/// Agent reply reduced to assistant prose and tool payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub assistant: Option<String>,
    pub tool_outputs: Vec<Value>,
    pub primary_tool_output: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    pub symptom: Vec<String>,
    /// Structured tool report when the tool ran, otherwise assistant text.
    pub pubmed_summary: Value,
    pub raw_agent: NormalizedResult,
}
