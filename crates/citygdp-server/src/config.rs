use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result};

use citygdp_api::chatbot::ChatConfig;
use citygdp_crypto::password::HashCost;

const DEFAULT_CHAT_API_URL: &str = "https://api.openai.com/v1/completions";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Server settings, read from `CITYGDP_*` environment variables.
#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub hash_cost: HashCost,
    pub report_embed_url: String,
    /// `None` disables the chatbot.
    pub chat: Option<ChatConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: parse_or(&vars, "CITYGDP_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&vars, "CITYGDP_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&vars, "CITYGDP_HASH_PARALLELISM", defaults.parallelism)?,
        };

        let chat = get("CITYGDP_CHAT_API_KEY").map(|api_key| ChatConfig {
            api_url: get("CITYGDP_CHAT_API_URL").unwrap_or_else(|| DEFAULT_CHAT_API_URL.into()),
            api_key,
            model: get("CITYGDP_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
        });

        Ok(Self {
            host: get("CITYGDP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&vars, "CITYGDP_PORT", 3000)?,
            db_path: get("CITYGDP_DB_PATH").unwrap_or_else(|| "citygdp.db".into()),
            hash_cost,
            report_embed_url: get("CITYGDP_REPORT_EMBED_URL").unwrap_or_default(),
            chat,
        })
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match vars.get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}
