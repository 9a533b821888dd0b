use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_TOKENS: u32 = 150;
/// Exchanges kept per connection; older ones are dropped from the prompt.
pub const MAX_HISTORY_EXCHANGES: usize = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chatbot is not configured")]
    Disabled,

    #[error("question must not be empty")]
    EmptyQuery,

    /// Display text stays generic; the request URL lives in the source error.
    #[error("chatbot request failed")]
    Http(#[from] reqwest::Error),

    #[error("chatbot service returned {0}")]
    Upstream(u16),

    #[error("chatbot returned no answer")]
    EmptyReply,
}

impl ChatError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Disabled => "chat_disabled",
            Self::EmptyQuery => "invalid_input",
            Self::Http(_) | Self::Upstream(_) | Self::EmptyReply => "chat_unavailable",
        }
    }
}

/// Completion endpoint settings. The key is injected from the environment.
#[derive(Clone)]
pub struct ChatConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

/// Forwards prompts to an OpenAI-compatible completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    /// Send one prompt; returns the first choice's text, trimmed.
    pub async fn complete(&self, prompt: &str) -> Result<String, ChatError> {
        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&CompletionRequest {
                model: &self.config.model,
                prompt,
                max_tokens: MAX_TOKENS,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Chat completion failed with {}", status);
            return Err(ChatError::Upstream(status.as_u16()));
        }

        let body: CompletionResponse = resp.json().await?;
        let reply = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ChatError::EmptyReply)?;

        debug!("Chat completion returned {} chars", reply.len());
        Ok(reply)
    }
}

/// Conversation of one connection, as `You: ...` / `Bot: ...` lines.
/// Holds at most [`MAX_HISTORY_EXCHANGES`] exchanges.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    lines: Vec<String>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every kept line, then the new query, one per line.
    pub fn prompt_for(&self, query: &str) -> String {
        let mut prompt = self.lines.join("\n");
        if !prompt.is_empty() {
            prompt.push('\n');
        }
        prompt.push_str(query);
        prompt
    }

    pub fn record(&mut self, query: &str, reply: &str) {
        self.lines.push(format!("You: {}", query));
        self.lines.push(format!("Bot: {}", reply));

        let max_lines = MAX_HISTORY_EXCHANGES * 2;
        if self.lines.len() > max_lines {
            let excess = self.lines.len() - max_lines;
            self.lines.drain(..excess);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// A validated question and the prompt built for it, not yet sent.
///
/// Owns everything it needs, so `send` can run on its own task while the
/// connection keeps serving other frames.
#[derive(Debug)]
pub struct Exchange {
    client: ChatClient,
    query: String,
    prompt: String,
}

impl Exchange {
    pub fn new(client: Option<&ChatClient>, history: &ChatHistory, query: &str) -> Result<Self, ChatError> {
        let client = client.ok_or(ChatError::Disabled)?;

        let query = query.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyQuery);
        }

        Ok(Self {
            client: client.clone(),
            query: query.to_string(),
            prompt: history.prompt_for(query),
        })
    }

    /// Returns the trimmed query together with the reply.
    pub async fn send(self) -> Result<Answer, ChatError> {
        let reply = self.client.complete(&self.prompt).await?;
        Ok(Answer {
            query: self.query,
            reply,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub query: String,
    pub reply: String,
}

/// Ask a question in the context of `history`. The exchange is recorded only
/// when a reply comes back.
pub async fn ask(
    client: Option<&ChatClient>,
    history: &mut ChatHistory,
    query: &str,
) -> Result<String, ChatError> {
    let answer = Exchange::new(client, history, query)?.send().await?;
    history.record(&answer.query, &answer.reply);
    Ok(answer.reply)
}
