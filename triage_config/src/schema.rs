use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use triage_core::record::DEFAULT_MAX_HISTORY;
use triage_core::{DEFAULT_SESSION_TTL_SECS, phase::PhaseLimits};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageSection,
}

/// Engine thresholds, externalized with their documented defaults: a budget
/// of 7 interview questions, a wrap-up nudge from 5, a one-hour cache TTL,
/// and 20 retained messages.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineSection {
    #[serde(default = "EngineSection::default_model")]
    pub model: String,
    #[serde(default = "EngineSection::default_max_history")]
    pub max_history: usize,
    #[serde(default = "EngineSection::default_question_budget")]
    pub question_budget: u32,
    #[serde(default = "EngineSection::default_wrapup_threshold")]
    pub wrapup_threshold: u32,
    #[serde(default = "EngineSection::default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            max_history: Self::default_max_history(),
            question_budget: Self::default_question_budget(),
            wrapup_threshold: Self::default_wrapup_threshold(),
            session_ttl_secs: Self::default_session_ttl_secs(),
        }
    }
}

impl EngineSection {
    fn default_model() -> String {
        "gemini-2.0-flash-exp".to_string()
    }

    const fn default_max_history() -> usize {
        DEFAULT_MAX_HISTORY
    }

    const fn default_question_budget() -> u32 {
        7
    }

    const fn default_wrapup_threshold() -> u32 {
        5
    }

    const fn default_session_ttl_secs() -> u64 {
        DEFAULT_SESSION_TTL_SECS
    }

    #[must_use]
    pub const fn limits(&self) -> PhaseLimits {
        PhaseLimits {
            question_budget: self.question_budget,
            wrapup_threshold: self.wrapup_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub gemini: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageSection {
    /// Directory for per-session JSON files. Defaults to ~/triage/sessions.
    #[serde(default)]
    pub sessions_dir: Option<PathBuf>,
    /// Directory for summary artifacts. Defaults to ~/triage/summaries.
    #[serde(default)]
    pub summaries_dir: Option<PathBuf>,
}

impl StorageSection {
    pub fn resolve(&self) -> anyhow::Result<(PathBuf, PathBuf)> {
        let base = Config::app_dir()?;
        let sessions = self
            .sessions_dir
            .clone()
            .unwrap_or_else(|| base.join("sessions"));
        let summaries = self
            .summaries_dir
            .clone()
            .unwrap_or_else(|| base.join("summaries"));
        Ok((sessions, summaries))
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::app_dir()?.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'triage init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_json::from_str(&content)?;

        Ok(config)
    }

    pub fn app_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("triage"))
    }

    pub fn ensure_app_dir() -> anyhow::Result<PathBuf> {
        let dir = Self::app_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_app_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "engine": {
    "model": "gemini-2.0-flash-exp",
    "max_history": 20,
    "question_budget": 7,
    "wrapup_threshold": 5,
    "session_ttl_secs": 3600
  },
  "providers": {
    "gemini": {
      "api_key": "your-gemini-api-key-here"
    }
  },
  "storage": {}
}"#;

        std::fs::write(&config_path, config_template)?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Edit the config file and add your Gemini API key");
        println!("   2. Run 'triage chat' to start a consultation");
        println!();
        println!("Configuration options:");
        println!("   - engine.model: generation model to use");
        println!("   - engine.max_history: messages retained per session");
        println!("   - engine.question_budget: interview questions before recommendations");
        println!("   - engine.session_ttl_secs: in-memory session lifetime");
        println!("   - storage.sessions_dir / storage.summaries_dir: override data locations");
        println!();
        Ok(())
    }
}
