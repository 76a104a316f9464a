use super::chunking::Chunker;
use crate::error::Result;
use crate::llm::TextModel;
use crate::models::{ArticleRecord, Document, RefineSummary};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// What the summarizer accepts.
#[derive(Debug, Clone)]
pub enum SummaryInput {
    Text(String),
    Articles(Vec<ArticleRecord>),
    /// Heterogeneous list; objects with article fields use the article template.
    Values(Vec<Value>),
    Other(Value),
}

impl SummaryInput {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::Values(items),
            other => Self::Other(other),
        }
    }

    fn into_documents(self) -> Vec<Document> {
        match self {
            Self::Text(text) => vec![Document::new(text)],
            Self::Articles(articles) => articles
                .iter()
                .map(|article| Document::new(render_article(article)))
                .collect(),
            Self::Values(items) => items
                .into_iter()
                .map(|item| Document::new(render_value(item)))
                .collect(),
            Self::Other(value) => vec![Document::new(stringify(&value))],
        }
    }
}

impl From<String> for SummaryInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for SummaryInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<ArticleRecord>> for SummaryInput {
    fn from(articles: Vec<ArticleRecord>) -> Self {
        Self::Articles(articles)
    }
}

impl From<Value> for SummaryInput {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

fn render_article(article: &ArticleRecord) -> String {
    format!(
        "Title: {}\n\nAbstract: {}\n\nAuthors: {}\n\nPublication Date: {}",
        article.title,
        article.abstract_text,
        article.authors.join(", "),
        article.publication_date
    )
}

fn render_value(value: Value) -> String {
    if value.is_object() {
        match serde_json::from_value::<ArticleRecord>(value.clone()) {
            Ok(article) => render_article(&article),
            Err(_) => stringify(&value),
        }
    } else {
        stringify(&value)
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn chunk_prompt(text: &str) -> String {
    format!(
        "Please summarize the below speech:\nSpeech:`{}'\nSummary:",
        text
    )
}

fn refine_prompt(existing_summary: &str, text: &str) -> String {
    format!(
        "Your job is to produce a final summary.\n\
We have provided an existing summary up to a certain point: {}\n\
We have the opportunity to refine the existing summary (only if needed) with some more context below.\n\
------------\n{}\n------------\n\
Given the new context, refine the original summary. If the context isn't useful, return the original summary.\n\
Provide the final summary of the entire speech with these important points. \
Add a Motivation Title, start the precise summary with an introduction and provide the summary in numbered points for the speech.",
        existing_summary, text
    )
}

/// Refine-style summarization over bounded, overlapping chunks.
pub struct Summarizer {
    model: Arc<dyn TextModel>,
    splitter: Chunker,
}

impl Summarizer {
    /// 2000-character chunks with 100 characters of overlap.
    pub fn new(model: Arc<dyn TextModel>) -> Result<Self> {
        Ok(Self::with_splitter(model, Chunker::with_defaults()?))
    }

    pub fn with_splitter(model: Arc<dyn TextModel>, splitter: Chunker) -> Self {
        Self { model, splitter }
    }

    /// Summarizes the first chunk, then folds each later chunk into the
    /// running summary. One model call per chunk, no system message.
    pub async fn summarize(&self, input: impl Into<SummaryInput>) -> Result<RefineSummary> {
        let chunks: Vec<Document> = input
            .into()
            .into_documents()
            .iter()
            .flat_map(|doc| {
                self.splitter
                    .split_text(&doc.page_content)
                    .into_iter()
                    .map(move |chunk| Document {
                        page_content: chunk,
                        metadata: doc.metadata.clone(),
                    })
            })
            .collect();

        info!("Summarizing {} chunks", chunks.len());

        let mut summary = String::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = if index == 0 {
                chunk_prompt(&chunk.page_content)
            } else {
                refine_prompt(&summary, &chunk.page_content)
            };

            summary = self.model.prompt("", &prompt).await?;
            debug!("Summary after chunk {}: {}", index + 1, summary);
        }

        Ok(RefineSummary {
            input_documents: chunks,
            output_text: summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use serde_json::json;

    fn article(title: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            abstract_text: "Abstract text.".to_string(),
            authors: vec!["Anna Smith".to_string(), "Bo Li".to_string()],
            publication_date: "Nov 2023".to_string(),
            article_url: "https://pubmed.ncbi.nlm.nih.gov/1/".to_string(),
        }
    }

    #[test]
    fn renders_articles_with_template() {
        let docs = SummaryInput::from(vec![article("Migraine")]).into_documents();
        assert_eq!(
            docs[0].page_content,
            "Title: Migraine\n\nAbstract: Abstract text.\n\nAuthors: Anna Smith, Bo Li\n\nPublication Date: Nov 2023"
        );
    }

    #[test]
    fn renders_heterogeneous_values() {
        let input = SummaryInput::from_value(json!([
            serde_json::to_value(article("Fever")).unwrap(),
            "plain note",
            {"unexpected": true},
            42
        ]));
        let docs = input.into_documents();

        assert!(docs[0].page_content.starts_with("Title: Fever\n\n"));
        assert_eq!(docs[1].page_content, "plain note");
        assert_eq!(docs[2].page_content, r#"{"unexpected":true}"#);
        assert_eq!(docs[3].page_content, "42");
    }

    #[test]
    fn other_values_are_stringified() {
        let docs = SummaryInput::from_value(json!({"k": "v"})).into_documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page_content, r#"{"k":"v"}"#);
    }

    #[tokio::test]
    async fn single_chunk_uses_chunk_prompt() {
        let model = Arc::new(ScriptedModel::with_replies(&["Short summary"]));
        let summarizer = Summarizer::new(model.clone()).unwrap();

        let result = summarizer.summarize(vec![article("Migraine")]).await.unwrap();

        assert_eq!(result.output_text, "Short summary");
        assert_eq!(result.input_documents.len(), 1);
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Please summarize the below speech:"));
        assert!(prompts[0].contains("Title: Migraine"));
        assert_eq!(model.calls.lock().unwrap()[0].0, "");
    }

    #[tokio::test]
    async fn refines_once_per_additional_chunk() {
        let model = Arc::new(ScriptedModel::with_replies(&["first", "second", "third"]));
        let summarizer =
            Summarizer::with_splitter(model.clone(), Chunker::new(10, 0).unwrap());

        let result = summarizer.summarize("aaaa bbbb\n\ncccc dddd\n\neeee ffff").await.unwrap();

        assert_eq!(result.input_documents.len(), 3);
        assert_eq!(result.output_text, "third");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("aaaa bbbb"));
        assert!(prompts[1].contains("existing summary up to a certain point: first"));
        assert!(prompts[1].contains("cccc dddd"));
        assert!(prompts[2].contains("point: second"));
        assert!(prompts[2].contains("Motivation Title"));
        assert!(model.calls.lock().unwrap().iter().all(|(preamble, _, _)| preamble.is_empty()));
    }

    #[tokio::test]
    async fn empty_input_skips_the_model() {
        let model = Arc::new(ScriptedModel::default());
        let summarizer = Summarizer::new(model.clone()).unwrap();

        let result = summarizer.summarize(Vec::<ArticleRecord>::new()).await.unwrap();

        assert!(result.input_documents.is_empty());
        assert_eq!(result.output_text, "");
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn model_errors_propagate() {
        let summarizer = Summarizer::new(Arc::new(ScriptedModel::default())).unwrap();
        assert!(summarizer.summarize("some text").await.is_err());
    }
}
