// src/config/model.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    3
}

/// External model client config, loaded from `config/model.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub enabled: bool,
    /// "groq" | "openai" (case-insensitive)
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GROQ_API_KEY / OPENAI_API_KEY (by provider)
    pub api_key: String,
    /// Per-attempt timeout for one model call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bounded retry budget for transient failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "groq".to_string(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ModelConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: ModelConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.to_lowercase();

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "groq" => env::var("GROQ_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing GROQ_API_KEY env var"))?,
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        // Sanitize timings so a bad file cannot hang or hot-loop the caller
        cfg.timeout_secs = cfg.timeout_secs.clamp(1, 120);
        cfg.max_attempts = cfg.max_attempts.clamp(1, 5);

        Ok(cfg)
    }

    /// Best-effort load for bootstrap paths: a missing or unresolvable
    /// config degrades to the disabled default instead of failing startup.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("model config unavailable, synthesis disabled: {e:#}");
                Self::default()
            }
        }
    }
}
