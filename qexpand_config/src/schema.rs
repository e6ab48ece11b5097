use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use qexpand_core::{AnswerSource, ExpansionConfig};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub expansion: ExpansionSettings,
    #[serde(default)]
    pub output: OutputConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExpansionSettings {
    #[serde(default = "ExpansionSettings::default_domain")]
    pub domain: String,
    /// Target dataset size.
    #[serde(default = "ExpansionSettings::default_num_questions")]
    pub num_questions: usize,
    #[serde(default = "ExpansionSettings::default_questions_per_round")]
    pub questions_per_round: usize,
    #[serde(default)]
    pub source_strategy: AnswerSource,
    #[serde(default = "ExpansionSettings::default_top_k_related")]
    pub top_k_related: usize,
    #[serde(default = "ExpansionSettings::default_min_edge_weight")]
    pub min_edge_weight: u64,
    #[serde(default = "ExpansionSettings::default_anchor_pool")]
    pub anchor_pool: usize,
    #[serde(default = "ExpansionSettings::default_max_stall_rounds")]
    pub max_stall_rounds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(default = "ExpansionSettings::default_answer_seeds")]
    pub answer_seeds: bool,
    #[serde(default)]
    pub grounding_enabled: bool,
    #[serde(default = "ExpansionSettings::default_context_passages")]
    pub context_passages: usize,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            domain: Self::default_domain(),
            num_questions: Self::default_num_questions(),
            questions_per_round: Self::default_questions_per_round(),
            source_strategy: AnswerSource::default(),
            top_k_related: Self::default_top_k_related(),
            min_edge_weight: Self::default_min_edge_weight(),
            anchor_pool: Self::default_anchor_pool(),
            max_stall_rounds: Self::default_max_stall_rounds(),
            max_rounds: None,
            answer_seeds: Self::default_answer_seeds(),
            grounding_enabled: false,
            context_passages: Self::default_context_passages(),
        }
    }
}

impl ExpansionSettings {
    fn default_domain() -> String {
        "general".to_string()
    }

    const fn default_num_questions() -> usize {
        15
    }

    const fn default_questions_per_round() -> usize {
        5
    }

    const fn default_top_k_related() -> usize {
        5
    }

    const fn default_min_edge_weight() -> u64 {
        1
    }

    const fn default_anchor_pool() -> usize {
        10
    }

    const fn default_max_stall_rounds() -> u32 {
        3
    }

    const fn default_answer_seeds() -> bool {
        true
    }

    const fn default_context_passages() -> usize {
        5
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_directory")]
    pub directory: PathBuf,
    #[serde(default = "OutputConfig::default_export_graph")]
    pub export_graph: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            export_graph: Self::default_export_graph(),
        }
    }
}

impl OutputConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("generated_datasets")
    }

    const fn default_export_graph() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub completion: CompletionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<EndpointConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<EndpointConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<DatastoreConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    #[serde(default = "CompletionConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "CompletionConfig::default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CompletionConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    fn default_model() -> String {
        "gpt-4o-mini".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatastoreConfig {
    pub endpoint: String,
    pub datastore_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

const fn default_timeout_secs() -> u64 {
    60
}

const CONFIG_TEMPLATE: &str = r#"{
  "expansion": {
    "domain": "general",
    "num_questions": 15,
    "questions_per_round": 5,
    "source_strategy": "llm",
    "top_k_related": 5,
    "min_edge_weight": 1,
    "anchor_pool": 10,
    "max_stall_rounds": 3,
    "answer_seeds": true,
    "grounding_enabled": false,
    "context_passages": 5
  },
  "output": {
    "directory": "generated_datasets",
    "export_graph": true
  },
  "providers": {
    "completion": {
      "api_key": "your-api-key-here",
      "base_url": "https://api.openai.com/v1",
      "model": "gpt-4o-mini",
      "timeout_secs": 60
    }
  },
  "logging": {
    "level": "info"
  }
}"#;

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("qexpand"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'qexpand init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config at {}: {e}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::ensure_config_dir()?.join("config.json");
        Self::write_template(&config_path)?;
        Ok(config_path)
    }

    /// Write the starter config, refusing to overwrite an existing file.
    pub fn write_template(config_path: &Path) -> anyhow::Result<()> {
        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }
        std::fs::write(config_path, CONFIG_TEMPLATE)?;
        Ok(())
    }

    /// Session settings for `domain`, or the configured default domain.
    #[must_use]
    pub fn to_expansion_config(&self, domain: Option<&str>) -> ExpansionConfig {
        let e = &self.expansion;
        ExpansionConfig {
            domain: domain.unwrap_or(&e.domain).to_string(),
            target_count: e.num_questions,
            questions_per_round: e.questions_per_round,
            source: e.source_strategy,
            top_k_related: e.top_k_related,
            min_edge_weight: e.min_edge_weight,
            anchor_pool: e.anchor_pool,
            max_stall_rounds: e.max_stall_rounds,
            max_rounds: e.max_rounds,
            answer_seeds: e.answer_seeds,
            context_passages: e.context_passages,
        }
    }
}
