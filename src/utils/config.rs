use std::path::PathBuf;
use std::sync::Arc;

use easy_config_store::ConfigStore;
use eyre::{Result, eyre};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::critique::parser::ParseMode;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub type Config = Arc<ConfigInner>;

pub fn config(path: PathBuf) -> Result<Config> {
    let config_store = ConfigStore::<ConfigInner>::read(path, "config".to_string())?;
    let inner = (*config_store).clone();

    info!("config parsing successful");
    debug!("loaded configuration:\n{}", toml::to_string_pretty(&inner.redacted())?);

    Ok(Arc::new(inner))
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigInner {
    pub llm: LLMConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct ReviewConfig {
    /// Render the sections that parsed instead of rejecting the whole reply.
    #[serde(default)]
    pub partial: bool,
}

impl ReviewConfig {
    pub fn parse_mode(&self) -> ParseMode {
        if self.partial {
            ParseMode::Partial
        } else {
            ParseMode::Strict
        }
    }
}

fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_llm_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl ConfigInner {
    /// The Gemini credential: the environment wins over the config file.
    pub fn api_key(&self) -> Result<String> {
        pick_api_key(std::env::var(API_KEY_ENV).ok(), self.llm.api_key.as_deref())
    }

    fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.llm.api_key.is_some() {
            copy.llm.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}

fn pick_api_key(from_env: Option<String>, from_config: Option<&str>) -> Result<String> {
    from_env
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            from_config
                .filter(|key| !key.trim().is_empty())
                .map(str::to_string)
        })
        .map(|key| key.trim().to_string())
        .ok_or_else(|| {
            eyre!(
                "{} not found; set it in the environment, a .env file or llm.api_key in the config",
                API_KEY_ENV
            )
        })
}

impl Default for ConfigInner {
    fn default() -> Self {
        let cfg = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.default.toml",));

        toml::from_str(cfg).unwrap() // should be okay
    }
}
