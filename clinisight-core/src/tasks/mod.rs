pub mod chunking;
pub mod pubmed_parse;
pub mod pubmed_search;
pub mod summary;
pub mod symptom_extraction;

pub use chunking::Chunker;
pub use pubmed_search::{PubMedFetcher, normalize_query};
pub use summary::{SummaryInput, Summarizer};
pub use symptom_extraction::SymptomExtractor;
