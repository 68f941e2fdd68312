//! Project configuration file support for refineloop.
//!
//! Loads configuration from `refineloop.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "refineloop.toml";

pub const DEFAULT_GENERATOR_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_CRITIC_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_CRITERIA: &str = "empathy, clarity, conciseness, actionable";

/// Project-level configuration loaded from `refineloop.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// OpenAI-compatible API base URL shared by both roles
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Generator system prompt
    pub system_prompt: Option<String>,
    pub criteria: Option<Vec<String>>,
    pub threshold: Option<f64>,
    pub max_iterations: Option<usize>,
    /// Initial generator temperature
    pub temperature: Option<f64>,
    pub max_retries: Option<u32>,
    /// Generator-specific configuration
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Critic-specific configuration
    #[serde(default)]
    pub critic: CriticConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CriticConfig {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    pub fn generator_model(&self) -> &str {
        self.generator
            .model
            .as_deref()
            .unwrap_or(DEFAULT_GENERATOR_MODEL)
    }

    pub fn critic_model(&self) -> &str {
        self.critic.model.as_deref().unwrap_or(DEFAULT_CRITIC_MODEL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
base_url = "http://localhost:8080/v1"
api_key_env = "LOCAL_KEY"
criteria = ["clarity", "accuracy"]
threshold = 0.9
max_iterations = 6
temperature = 0.5
max_retries = 2

[generator]
model = "llama-3.3-70b-versatile"
max_tokens = 2048

[critic]
temperature = 0.0
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(config.api_key_env(), "LOCAL_KEY");
        assert_eq!(
            config.criteria,
            Some(vec!["clarity".to_string(), "accuracy".to_string()])
        );
        assert_eq!(config.threshold, Some(0.9));
        assert_eq!(config.max_iterations, Some(6));
        assert_eq!(config.max_retries, Some(2));
        assert_eq!(config.generator_model(), "llama-3.3-70b-versatile");
        assert_eq!(config.generator.max_tokens, Some(2048));
        assert_eq!(config.critic_model(), DEFAULT_CRITIC_MODEL);
        assert_eq!(config.critic.temperature, Some(0.0));
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ProjectConfig::default();
        assert_eq!(config.generator_model(), DEFAULT_GENERATOR_MODEL);
        assert_eq!(config.critic_model(), DEFAULT_CRITIC_MODEL);
        assert_eq!(config.api_key_env(), DEFAULT_API_KEY_ENV);
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "tempurature = 0.4\n").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }
}
