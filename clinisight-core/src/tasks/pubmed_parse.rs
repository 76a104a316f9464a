use crate::error::{ClinisightError, Result};
use crate::models::{ArticleRecord, NO_ABSTRACT, NO_AUTHORS, NO_DATE, NO_TITLE};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

#[derive(Default)]
struct AuthorParts {
    last_name: Option<String>,
    fore_name: Option<String>,
}

impl AuthorParts {
    fn display_name(self) -> Option<String> {
        match (self.fore_name, self.last_name) {
            (Some(fore), Some(last)) => Some(format!("{} {}", fore, last)),
            (None, Some(last)) => Some(last),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ArticleBuilder {
    pmid: Option<String>,
    title: Option<String>,
    abstract_parts: Option<Vec<String>>,
    authors: Vec<String>,
    current_author: Option<AuthorParts>,
    year: Option<String>,
    month: Option<String>,
}

impl ArticleBuilder {
    fn build(self, fallback_pmid: Option<&String>) -> ArticleRecord {
        let title = self
            .title
            .map(|t| collapse_whitespace(&t))
            .unwrap_or_else(|| NO_TITLE.to_string());

        let abstract_text = self
            .abstract_parts
            .map(|parts| parts.join(" "))
            .unwrap_or_else(|| NO_ABSTRACT.to_string());

        let authors = if self.authors.is_empty() {
            vec![NO_AUTHORS.to_string()]
        } else {
            self.authors
        };

        let publication_date = match (self.month, self.year) {
            (Some(month), Some(year)) => format!("{} {}", month, year),
            (None, Some(year)) => year,
            _ => NO_DATE.to_string(),
        };

        let pmid = self.pmid.or_else(|| fallback_pmid.cloned()).unwrap_or_default();

        ArticleRecord {
            title,
            abstract_text,
            authors,
            publication_date,
            article_url: ArticleRecord::pubmed_url(&pmid),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_ancestor(path: &[String], name: &str) -> bool {
    path.iter().any(|p| p == name)
}

/// `true` when the innermost elements of `path` are exactly `suffix`.
fn ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

/// Parses an EFetch `PubmedArticleSet` document.
///
/// `id_list` supplies the PMID for a citation that lacks its own.
pub fn parse_efetch_xml(xml: &str, id_list: &[String]) -> Result<Vec<ArticleRecord>> {
    let mut reader = Reader::from_str(xml);

    let mut articles = Vec::new();
    let mut current: Option<ArticleBuilder> = None;
    let mut path: Vec<String> = Vec::new();
    let mut buffer = Vec::new();

    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                path.push(name);

                if let Some(article) = current.as_mut() {
                    let in_article = has_ancestor(&path, "Article");
                    match path.last().map(String::as_str) {
                        Some("ArticleTitle") if in_article && article.title.is_none() => {
                            article.title = Some(String::new());
                        }
                        Some("Abstract") if in_article && article.abstract_parts.is_none() => {
                            article.abstract_parts = Some(Vec::new());
                        }
                        Some("Author") if in_article => {
                            article.current_author = Some(AuthorParts::default());
                        }
                        _ => {}
                    }
                } else if path.last().map(String::as_str) == Some("PubmedArticle") {
                    current = Some(ArticleBuilder::default());
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(article) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    collect_text(article, &path, text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(article) = current.as_mut() {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    collect_text(article, &path, text);
                }
            }
            Ok(Event::End(_)) => {
                let closed = path.pop();
                match closed.as_deref() {
                    Some("Author") => {
                        if let Some(article) = current.as_mut() {
                            if let Some(name) =
                                article.current_author.take().and_then(AuthorParts::display_name)
                            {
                                article.authors.push(name);
                            }
                        }
                    }
                    Some("PubmedArticle") => {
                        if let Some(article) = current.take() {
                            articles.push(article.build(id_list.get(articles.len())));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ClinisightError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }

        buffer.clear();
    }

    Ok(articles)
}

fn collect_text(article: &mut ArticleBuilder, path: &[String], text: String) {
    if has_ancestor(path, "ArticleTitle") {
        if let Some(title) = article.title.as_mut() {
            title.push_str(&text);
        }
    } else if has_ancestor(path, "Abstract") && has_ancestor(path, "Article") {
        let trimmed = text.trim();
        if let Some(parts) = article.abstract_parts.as_mut() {
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    } else if ends_with(path, &["Author", "LastName"]) {
        if let Some(author) = article.current_author.as_mut() {
            author.last_name.get_or_insert_with(String::new).push_str(&text);
        }
    } else if ends_with(path, &["Author", "ForeName"]) {
        if let Some(author) = article.current_author.as_mut() {
            author.fore_name.get_or_insert_with(String::new).push_str(&text);
        }
    } else if ends_with(path, &["MedlineCitation", "PMID"]) {
        if article.pmid.is_none() {
            article.pmid = Some(text.trim().to_string());
        }
    } else if ends_with(path, &["JournalIssue", "PubDate", "Year"]) {
        article.year = Some(text.trim().to_string());
    } else if ends_with(path, &["JournalIssue", "PubDate", "Month"]) {
        article.month = Some(text.trim().to_string());
    }
}
