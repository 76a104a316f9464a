use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NO_TITLE: &str = "No title";
pub const NO_ABSTRACT: &str = "No abstract available";
pub const NO_AUTHORS: &str = "No authors listed";
pub const NO_DATE: &str = "No date";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub publication_date: String,
    pub article_url: String,
}

impl ArticleRecord {
    /// Stand-in returned when PubMed yields nothing or cannot be reached.
    pub fn mock() -> Self {
        Self {
            title: "Simulated Study on Fever".to_string(),
            abstract_text: "This is a simulated abstract on the treatment of fever in adults."
                .to_string(),
            authors: vec!["John Doe".to_string(), "Jane Smith".to_string()],
            publication_date: "March 2024".to_string(),
            article_url: "https://pubmed.ncbi.nlm.nih.gov/12345678/".to_string(),
        }
    }

    /// Inert record carrying a fetch failure when the mock fallback is off.
    pub fn error_notice(message: impl std::fmt::Display) -> Self {
        Self {
            title: format!("Error: {}", message),
            abstract_text: NO_ABSTRACT.to_string(),
            authors: Vec::new(),
            publication_date: NO_DATE.to_string(),
            article_url: String::new(),
        }
    }

    pub fn pubmed_url(pmid: &str) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
    }
}

/// A unit of text fed through the summarization chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Map::new(),
        }
    }
}

/// Output of the refine chain, returned as produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineSummary {
    pub input_documents: Vec<Document>,
    pub output_text: String,
}

/// Result of the `clinisight_ai` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinisightReport {
    pub symptom: String,
    pub pubmed_summary: RefineSummary,
}
