use crate::config::Config;
use crate::error::Result;
use crate::llm::{GroqTextModel, TextModel};
use crate::models::ClinisightReport;
use crate::tasks::{PubMedFetcher, Summarizer, SymptomExtractor};
use std::sync::Arc;
use tracing::info;

/// Upper bound on the article list handed to the summarizer.
pub const SUMMARY_ARTICLE_CAP: usize = 3000;

/// Symptom text in, literature summary out.
pub struct ClinisightWorkflow {
    extractor: SymptomExtractor,
    fetcher: PubMedFetcher,
    summarizer: Summarizer,
}

impl ClinisightWorkflow {
    pub fn new(extractor: SymptomExtractor, fetcher: PubMedFetcher, summarizer: Summarizer) -> Self {
        Self {
            extractor,
            fetcher,
            summarizer,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn TextModel> = Arc::new(GroqTextModel::from_config(&config.llm));

        Ok(Self::new(
            SymptomExtractor::new(model.clone()),
            PubMedFetcher::from_config(&config.pubmed)?,
            Summarizer::new(model)?,
        ))
    }

    pub async fn run(&self, symptom_text: &str) -> Result<ClinisightReport> {
        info!("Starting Clinisight workflow");

        let symptom = self.extractor.extract(symptom_text).await?;

        let mut articles = self
            .fetcher
            .fetch(&symptom, self.fetcher.default_max_results(), true)
            .await;
        info!("Retrieved {} articles for '{}'", articles.len(), symptom.trim());

        articles.truncate(SUMMARY_ARTICLE_CAP);
        let pubmed_summary = self.summarizer.summarize(articles).await?;

        info!("Clinisight workflow completed");
        Ok(ClinisightReport {
            symptom,
            pubmed_summary,
        })
    }
}
