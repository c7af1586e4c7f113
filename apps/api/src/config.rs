use anyhow::{bail, Context, Result};

const DEFAULT_CEREBRAS_API_URL: &str = "https://api.cerebras.ai/v1/chat/completions";
const DEFAULT_OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_CEREBRAS_MODEL: &str = "llama-4-scout-17b-16e-instruct";
const DEFAULT_OPENROUTER_MODEL: &str = "meta-llama/llama-3.3-8b-instruct:free";

/// Application configuration loaded from environment variables.
/// Built once in `main` and passed down; nothing else reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub cerebras_api_key: String,
    pub cerebras_api_url: String,
    pub cerebras_model: String,
    pub openrouter_api_key: String,
    pub openrouter_api_url: String,
    pub openrouter_model: String,
    /// Sent as `HTTP-Referer` to OpenRouter.
    pub openrouter_referer: String,
    /// Max concurrent section streams per batch.
    pub stream_batch_size: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let stream_batch_size = optional_env("STREAM_BATCH_SIZE", "3")
            .parse::<usize>()
            .context("STREAM_BATCH_SIZE must be a positive integer")?;
        if stream_batch_size == 0 {
            bail!("STREAM_BATCH_SIZE must be at least 1");
        }

        Ok(Config {
            cerebras_api_key: require_env("CEREBRAS_API_KEY")?,
            cerebras_api_url: optional_env("CEREBRAS_API_URL", DEFAULT_CEREBRAS_API_URL),
            cerebras_model: optional_env("CEREBRAS_MODEL", DEFAULT_CEREBRAS_MODEL),
            openrouter_api_key: require_env("OPENROUTER_API_KEY")?,
            openrouter_api_url: optional_env("OPENROUTER_API_URL", DEFAULT_OPENROUTER_API_URL),
            openrouter_model: optional_env("OPENROUTER_MODEL", DEFAULT_OPENROUTER_MODEL),
            openrouter_referer: optional_env("OPENROUTER_REFERER", "http://localhost:3000"),
            stream_batch_size,
            port: optional_env("PORT", "8000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
