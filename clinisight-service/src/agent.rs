use crate::models::NormalizedResult;
use crate::normalize::normalize_reply;
use async_trait::async_trait;
use clinisight_core::config::LlmConfig;
use clinisight_core::{ClinisightError, Config, Result};
use reqwest::Client;
use rmcp::{
    RoleClient, ServiceExt,
    model::{CallToolRequestParam, ClientInfo, Tool},
    service::RunningService,
    transport::StreamableHttpClientTransport,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A tool as advertised by the tool server.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Map<String, Value>,
}

impl ToolSpec {
    /// OpenAI function-tool definition.
    pub fn to_openai_tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

impl From<&Tool> for ToolSpec {
    fn from(tool: &Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.as_deref().unwrap_or_default().to_string(),
            input_schema: tool.input_schema.as_ref().clone(),
        }
    }
}

/// One open connection to a tool server.
#[async_trait]
pub trait ToolSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>>;

    /// Returns the tool's text content.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens a fresh [`ToolSession`] per request.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ToolSession>>;
}

pub struct McpToolSession {
    service: RunningService<RoleClient, ClientInfo>,
}

#[async_trait]
impl ToolSession for McpToolSession {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|e| ClinisightError::Mcp(e.to_string()))?;
        Ok(tools.iter().map(ToolSpec::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| ClinisightError::Mcp(e.to_string()))?;

        if result.is_error.unwrap_or(false) {
            warn!("Tool {} reported an error", name);
        }

        let texts: Vec<String> = result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect();

        if texts.is_empty() {
            Ok(result
                .structured_content
                .map(|v| v.to_string())
                .unwrap_or_default())
        } else {
            Ok(texts.join("\n"))
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.service
            .cancel()
            .await
            .map_err(|e| ClinisightError::Mcp(e.to_string()))?;
        Ok(())
    }
}

/// Streamable HTTP connector for the Clinisight tool server.
pub struct McpConnector {
    url: String,
}

impl McpConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ToolConnector for McpConnector {
    async fn connect(&self) -> Result<Box<dyn ToolSession>> {
        info!("Connecting to MCP server at {}", self.url);
        let transport = StreamableHttpClientTransport::from_uri(self.url.clone());
        let service = ClientInfo::default()
            .serve(transport)
            .await
            .map_err(|e| ClinisightError::Mcp(e.to_string()))?;
        Ok(Box::new(McpToolSession { service }))
    }
}

/// One step of a chat-completions conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the assistant message object of the first choice.
    async fn complete(&self, messages: &[Value], tools: &[Value]) -> Result<Value>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionsClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            &config.api_base,
            config.groq_api_key.clone(),
            config.agent_model.clone(),
            config.agent_temperature,
            config.agent_max_tokens,
        )
    }
}

#[async_trait]
impl ChatModel for ChatCompletionsClient {
    async fn complete(&self, messages: &[Value], tools: &[Value]) -> Result<Value> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
            body["tool_choice"] = json!("auto");
        }

        debug!("chat: api_base={} model={}", self.api_base, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!("LLM returned HTTP {}: {}", status, text);
            return Err(ClinisightError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let data: Value = serde_json::from_str(&text)?;
        data.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .cloned()
            .ok_or_else(|| ClinisightError::Llm("No choices in LLM response".to_string()))
    }
}

/// Runs a diagnosis request end to end.
#[async_trait]
pub trait DiagnosisAgent: Send + Sync {
    async fn run_agent_with_query(&self, user_message: &str) -> Result<NormalizedResult>;
}

/// Tool-calling loop: the model may call server tools until it answers
/// without tool calls or `max_turns` model calls have been made.
pub struct AgentRunner {
    chat: Arc<dyn ChatModel>,
    connector: Arc<dyn ToolConnector>,
    max_turns: usize,
}

impl AgentRunner {
    pub fn new(chat: Arc<dyn ChatModel>, connector: Arc<dyn ToolConnector>, max_turns: usize) -> Self {
        Self {
            chat,
            connector,
            max_turns,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ChatCompletionsClient::from_config(&config.llm)),
            Arc::new(McpConnector::new(config.mcp.url.clone())),
            config.llm.agent_max_turns,
        )
    }

    /// Returns the raw reply, `{"messages": [...]}`.
    pub async fn run_with_session(&self, session: &dyn ToolSession, user_message: &str) -> Result<Value> {
        let tools = session.list_tools().await?;
        info!("Available tools:");
        for tool in &tools {
            info!("  - {}: {}", tool.name, tool.description);
        }
        let tool_defs: Vec<Value> = tools.iter().map(ToolSpec::to_openai_tool).collect();

        info!("Sending message: {}", user_message);
        let mut messages = vec![json!({"role": "user", "content": user_message})];

        for turn in 1..=self.max_turns {
            let assistant = self.chat.complete(&messages, &tool_defs).await?;
            let tool_calls = assistant
                .get("tool_calls")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            messages.push(assistant);

            if tool_calls.is_empty() {
                return Ok(json!({ "messages": messages }));
            }

            debug!("Turn {}: {} tool call(s)", turn, tool_calls.len());
            for call in &tool_calls {
                let id = call.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = call["function"]["name"].as_str().unwrap_or_default();
                let arguments = parse_arguments(&call["function"]["arguments"]);

                info!("Calling tool {}", name);
                let content = match session.call_tool(name, arguments).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Tool {} failed: {}", name, e);
                        format!("Error: {}", e)
                    }
                };

                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": id,
                    "name": name,
                    "content": content,
                }));
            }
        }

        warn!("Agent stopped after {} turns without a final answer", self.max_turns);
        Ok(json!({ "messages": messages }))
    }
}

fn parse_arguments(raw: &Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map.clone(),
        Value::String(text) => match serde_json::from_str(text) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!("Ignoring malformed tool arguments: {}", text);
                Map::new()
            }
        },
        _ => Map::new(),
    }
}

#[async_trait]
impl DiagnosisAgent for AgentRunner {
    async fn run_agent_with_query(&self, user_message: &str) -> Result<NormalizedResult> {
        let session = self.connector.connect().await?;
        let reply = self.run_with_session(session.as_ref(), user_message).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close tool session: {}", e);
        }

        let reply = reply?;
        info!("Raw agent response: {}", reply);
        Ok(normalize_reply(&reply))
    }
}
