use crate::error::{ClinisightError, Result};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub pubmed: PubMedConfig,
    pub mcp: McpConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub groq_api_key: String,
    /// OpenAI-compatible base used by the agent run-loop.
    pub api_base: String,
    pub agent_model: String,
    pub agent_temperature: f64,
    pub agent_max_tokens: u32,
    pub agent_max_turns: usize,
    /// Model behind symptom extraction and summarization.
    pub task_model: String,
    pub task_temperature: f64,
}

// Keeps the API key out of startup logs.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("agent_model", &self.agent_model)
            .field("agent_temperature", &self.agent_temperature)
            .field("agent_max_tokens", &self.agent_max_tokens)
            .field("agent_max_turns", &self.agent_max_turns)
            .field("task_model", &self.task_model)
            .field("task_temperature", &self.task_temperature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct PubMedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_results: usize,
    pub tool: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct McpConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Where the agent runner connects.
    pub url: String,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let groq_api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ClinisightError::Config("GROQ_API_KEY not set".to_string()))?;

        let mcp_host = text_or(&lookup, "MCP_HOST", "0.0.0.0");
        let mcp_port = parse_or(&lookup, "MCP_PORT", 8000)?;
        let mcp_path = text_or(&lookup, "MCP_PATH", "/mcp");
        let mcp_url = lookup("MCP_URL")
            .unwrap_or_else(|| format!("http://localhost:{}{}", mcp_port, mcp_path));

        Ok(Self {
            server: ServerConfig {
                host: text_or(&lookup, "HOST", "0.0.0.0"),
                port: parse_or(&lookup, "PORT", 8080)?,
                cors_allowed_origins: text_or(
                    &lookup,
                    "ALLOWED_ORIGINS",
                    "http://localhost:5173,http://localhost:3000",
                )
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            llm: LlmConfig {
                groq_api_key,
                api_base: text_or(&lookup, "GROQ_API_BASE", "https://api.groq.com/openai/v1"),
                agent_model: text_or(&lookup, "AGENT_MODEL", "openai/gpt-oss-20b"),
                agent_temperature: parse_or(&lookup, "AGENT_TEMPERATURE", 0.5)?,
                agent_max_tokens: parse_or(&lookup, "AGENT_MAX_TOKENS", 500)?,
                agent_max_turns: parse_or(&lookup, "AGENT_MAX_TURNS", 6)?,
                task_model: text_or(&lookup, "TASK_MODEL", "llama-3.1-8b-instant"),
                task_temperature: parse_or(&lookup, "TASK_TEMPERATURE", 0.7)?,
            },
            pubmed: PubMedConfig {
                base_url: text_or(
                    &lookup,
                    "PUBMED_BASE_URL",
                    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils",
                ),
                timeout_secs: parse_or(&lookup, "PUBMED_TIMEOUT_SECS", 10)?,
                max_results: parse_or(&lookup, "PUBMED_MAX_RESULTS", 3)?,
                tool: text_or(&lookup, "PUBMED_TOOL", "MyPubMedClient"),
                email: text_or(&lookup, "PUBMED_EMAIL", "youremail@example.com"),
            },
            mcp: McpConfig {
                host: mcp_host,
                port: mcp_port,
                path: mcp_path,
                url: mcp_url,
            },
        })
    }
}

fn text_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ClinisightError::Config(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_a_startup_failure() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ClinisightError::Config(_)));

        let blank = Config::from_lookup(lookup_from(&[("GROQ_API_KEY", "  ")]));
        assert!(blank.is_err());
    }

    #[test]
    fn defaults_match_the_deployed_services() {
        let config = Config::from_lookup(lookup_from(&[("GROQ_API_KEY", "gsk_test")])).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://localhost:5173", "http://localhost:3000"]
        );
        assert_eq!(config.llm.agent_model, "openai/gpt-oss-20b");
        assert_eq!(config.llm.agent_max_tokens, 500);
        assert_eq!(config.llm.task_model, "llama-3.1-8b-instant");
        assert_eq!(config.pubmed.max_results, 3);
        assert_eq!(config.pubmed.timeout_secs, 10);
        assert_eq!(config.mcp.port, 8000);
        assert_eq!(config.mcp.url, "http://localhost:8000/mcp");
    }

    #[test]
    fn mcp_url_follows_port_and_path_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("MCP_PORT", "9100"),
            ("MCP_PATH", "/tools"),
        ]))
        .unwrap();

        assert_eq!(config.mcp.url, "http://localhost:9100/tools");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let config = Config::from_lookup(lookup_from(&[("GROQ_API_KEY", "gsk_secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("gsk_secret"));
    }
}
