use super::pubmed_parse::parse_efetch_xml;
use crate::config::PubMedConfig;
use crate::error::{ClinisightError, Result};
use crate::models::ArticleRecord;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

const USER_AGENT: &str = "Mozilla/5.0";

/// Thin client over the NCBI E-utilities `esearch` and `efetch` endpoints.
#[derive(Clone)]
pub struct PubMedFetcher {
    client: Client,
    base_url: String,
    max_results: usize,
    tool: String,
    email: String,
}

impl PubMedFetcher {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        max_results: usize,
        tool: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results,
            tool: tool.into(),
            email: email.into(),
        }
    }

    pub fn from_config(config: &PubMedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::new(
            client,
            config.base_url.clone(),
            config.max_results,
            config.tool.clone(),
            config.email.clone(),
        ))
    }

    pub fn default_max_results(&self) -> usize {
        self.max_results
    }

    /// Searches PubMed and returns parsed article records.
    ///
    /// Never fails: upstream problems yield the mock record, or a single
    /// error record when `use_mock_if_empty` is off.
    pub async fn fetch(
        &self,
        query: &str,
        max_results: usize,
        use_mock_if_empty: bool,
    ) -> Vec<ArticleRecord> {
        let query = normalize_query(query);
        if query.is_empty() {
            warn!("Empty search query after normalization, skipping PubMed");
            return Vec::new();
        }

        match self.try_fetch(&query, max_results, use_mock_if_empty).await {
            Ok(articles) => articles,
            Err(e) => {
                error!("PubMed fetch failed for '{}': {}", query, e);
                if use_mock_if_empty {
                    warn!("Falling back to mock article");
                    vec![ArticleRecord::mock()]
                } else {
                    vec![ArticleRecord::error_notice(e)]
                }
            }
        }
    }

    async fn try_fetch(
        &self,
        query: &str,
        max_results: usize,
        use_mock_if_empty: bool,
    ) -> Result<Vec<ArticleRecord>> {
        let term = build_search_term(query);
        info!("Searching PubMed for: {}", term);

        let search_url = format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmax={}&retmode=json&tool={}&email={}",
            self.base_url,
            urlencoding::encode(&term),
            max_results,
            urlencoding::encode(&self.tool),
            urlencoding::encode(&self.email)
        );

        let search_response = self.client.get(&search_url).send().await?;
        let status = search_response.status();
        if !status.is_success() {
            return Err(ClinisightError::UpstreamStatus {
                status: status.as_u16(),
                body: search_response.text().await.unwrap_or_default(),
            });
        }

        let search_data: Value = serde_json::from_str(&search_response.text().await?)?;
        let ids: Vec<String> = search_data["esearchresult"]["idlist"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            warn!("No PubMed ids found for '{}'", query);
            return Ok(mock_if(use_mock_if_empty));
        }

        info!("Found {} PubMed ids, fetching details", ids.len());

        let fetch_url = format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml&tool={}&email={}",
            self.base_url,
            ids.join(","),
            urlencoding::encode(&self.tool),
            urlencoding::encode(&self.email)
        );

        let fetch_response = self.client.get(&fetch_url).send().await?;
        let status = fetch_response.status();
        if !status.is_success() {
            return Err(ClinisightError::UpstreamStatus {
                status: status.as_u16(),
                body: fetch_response.text().await.unwrap_or_default(),
            });
        }

        let xml = fetch_response.text().await?;
        let articles = parse_efetch_xml(&xml, &ids)?;

        if articles.is_empty() {
            warn!("EFetch returned no parsable articles");
            return Ok(mock_if(use_mock_if_empty));
        }

        info!("Parsed {} PubMed articles", articles.len());
        Ok(articles)
    }
}

fn mock_if(use_mock: bool) -> Vec<ArticleRecord> {
    if use_mock {
        vec![ArticleRecord::mock()]
    } else {
        Vec::new()
    }
}

/// Trims, collapses whitespace runs and strips leading `=`, `:`, `-`, `_`.
pub fn normalize_query(query: &str) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '=' | ':' | '-' | '_'))
        .trim()
        .to_string()
}

/// `"a, b"` becomes `"a"[Title/Abstract] OR "b"[Title/Abstract]`.
pub fn build_search_term(query: &str) -> String {
    query
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| format!("\"{}\"[Title/Abstract]", part))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NO_AUTHORS, NO_DATE};
    use mockito::{Matcher, Server};

    const EFETCH_XML: &str = r#"<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>555</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><Year>2022</Year><Month>Feb</Month></PubDate></JournalIssue></Journal>
        <ArticleTitle>Tension headache outcomes</ArticleTitle>
        <Abstract><AbstractText>Short abstract.</AbstractText></Abstract>
        <AuthorList><Author><LastName>Rossi</LastName><ForeName>Marco</ForeName></Author></AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    fn fetcher(base_url: &str) -> PubMedFetcher {
        PubMedFetcher::new(Client::new(), base_url, 3, "MyPubMedClient", "me@example.com")
    }

    #[test]
    fn normalizes_queries() {
        assert_eq!(normalize_query("  =: headache,\n\t nausea  "), "headache, nausea");
        assert_eq!(normalize_query("-_fever"), "fever");
        assert_eq!(normalize_query("= \n ="), "");
        assert_eq!(normalize_query("= ="), "");
        assert_eq!(normalize_query(": - _ =  cough"), "cough");
    }

    #[test]
    fn builds_or_joined_search_term() {
        assert_eq!(
            build_search_term("headache, nausea,"),
            "\"headache\"[Title/Abstract] OR \"nausea\"[Title/Abstract]"
        );
    }

    #[tokio::test]
    async fn empty_query_makes_no_request() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", Matcher::Regex(r"^/esearch\.fcgi".into()))
            .expect(0)
            .create_async()
            .await;

        let client = fetcher(&server.url());
        assert!(client.fetch(" = ", 3, true).await.is_empty());
        assert!(client.fetch("= =", 3, true).await.is_empty());
        assert!(client.fetch("\n=\t= =", 3, false).await.is_empty());
        search.assert_async().await;
    }

    #[tokio::test]
    async fn no_ids_yields_mock_or_nothing() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", Matcher::Regex(r"^/esearch\.fcgi".into()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded("retmax".into(), "3".into()),
                Matcher::UrlEncoded("term".into(), "\"xyzzy\"[Title/Abstract]".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"esearchresult":{"count":"0","idlist":[]}}"#)
            .expect(2)
            .create_async()
            .await;

        let client = fetcher(&server.url());
        assert_eq!(client.fetch("xyzzy", 3, true).await, vec![ArticleRecord::mock()]);
        assert!(client.fetch("xyzzy", 3, false).await.is_empty());
        search.assert_async().await;
    }

    #[tokio::test]
    async fn fetches_and_parses_articles() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", Matcher::Regex(r"^/esearch\.fcgi".into()))
            .with_status(200)
            .with_body(r#"{"esearchresult":{"idlist":["555"]}}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", Matcher::Regex(r"^/efetch\.fcgi".into()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "555".into()),
                Matcher::UrlEncoded("retmode".into(), "xml".into()),
            ]))
            .with_status(200)
            .with_body(EFETCH_XML)
            .create_async()
            .await;

        let articles = fetcher(&server.url()).fetch("headache", 3, true).await;

        fetch.assert_async().await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Tension headache outcomes");
        assert_eq!(articles[0].authors, vec!["Marco Rossi"]);
        assert_eq!(articles[0].publication_date, "Feb 2022");
        assert_eq!(articles[0].article_url, "https://pubmed.ncbi.nlm.nih.gov/555/");
    }

    #[tokio::test]
    async fn upstream_error_status_falls_back() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", Matcher::Regex(r"^/esearch\.fcgi".into()))
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let client = fetcher(&server.url());
        assert_eq!(client.fetch("fever", 3, true).await, vec![ArticleRecord::mock()]);

        let without_fallback = client.fetch("fever", 3, false).await;
        assert_eq!(without_fallback.len(), 1);
        assert!(without_fallback[0].title.starts_with("Error: "));
        assert!(without_fallback[0].authors.is_empty());
        assert_eq!(without_fallback[0].publication_date, NO_DATE);
    }

    #[tokio::test]
    async fn unreachable_host_falls_back() {
        let client = fetcher("http://127.0.0.1:1");

        assert_eq!(client.fetch("fever", 3, true).await, vec![ArticleRecord::mock()]);

        let records = client.fetch("fever", 3, false).await;
        assert_eq!(records.len(), 1);
        assert!(records[0].title.starts_with("Error: "));
    }

    #[tokio::test]
    async fn unparsable_articles_fall_back_to_mock() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", Matcher::Regex(r"^/esearch\.fcgi".into()))
            .with_status(200)
            .with_body(r#"{"esearchresult":{"idlist":["1"]}}"#)
            .create_async()
            .await;
        let _fetch = server
            .mock("GET", Matcher::Regex(r"^/efetch\.fcgi".into()))
            .with_status(200)
            .with_body("<PubmedArticleSet></PubmedArticleSet>")
            .create_async()
            .await;

        let articles = fetcher(&server.url()).fetch("fever", 3, true).await;
        assert_eq!(articles, vec![ArticleRecord::mock()]);
        assert_ne!(articles[0].authors, vec![NO_AUTHORS]);
    }
}
