use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::DEFAULT_OLLAMA_URL;
use crate::dispatcher::DEFAULT_DISPATCH_DELAY;
use crate::fallback::{Fallback, STATIC_REPLY};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ollama_url: String,
    pub default_model: Option<String>,
    pub dispatch_delay_ms: u64,
    pub fallback_reply: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            default_model: None,
            dispatch_delay_ms: DEFAULT_DISPATCH_DELAY.as_millis() as u64,
            fallback_reply: STATIC_REPLY.to_string(),
        }
    }

    /// Load from `path`, then apply `OLLAMA_HOST`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        config.apply_env(std::env::var("OLLAMA_HOST").ok());
        Ok(config)
    }

    /// Missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Rewrites the file with `default_model` set. An unreadable or invalid
    /// file is left untouched.
    pub fn save_default_model(path: &Path, model: &str) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.default_model = Some(model.to_string());
        config.save_to(path)
    }

    /// `OLLAMA_HOST` may be a bare `host:port`, as the Ollama CLI accepts.
    pub fn apply_env(&mut self, ollama_host: Option<String>) {
        if let Some(host) = ollama_host.filter(|h| !h.trim().is_empty()) {
            let host = host.trim();
            self.ollama_url = if host.starts_with("http://") || host.starts_with("https://") {
                host.to_string()
            } else {
                format!("http://{}", host)
            };
        }
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    pub fn fallback(&self) -> Fallback {
        Fallback::constant(self.fallback_reply.clone())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("tertulia"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.dispatch_delay(), Duration::from_millis(500));
        assert_eq!(config.fallback().render("llama2", "Hello"), "[llama2] Static reply from AI");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "dispatch_delay_ms": 0, "default_model": "mistral" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.dispatch_delay(), Duration::ZERO);
        assert_eq!(config.default_model.as_deref(), Some("mistral"));
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_default_model_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        Config::save_default_model(&path, "llama2").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("llama2"));
        assert_eq!(config.fallback_reply, STATIC_REPLY);
    }

    #[test]
    fn test_save_default_model_keeps_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "ollama_url": "http://gpu-box:11434", "dispatch_delay_ms": 0 }"#)
            .unwrap();

        Config::save_default_model(&path, "mistral").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.dispatch_delay_ms, 0);
        assert_eq!(config.default_model.as_deref(), Some("mistral"));
    }

    #[test]
    fn test_save_default_model_leaves_invalid_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ \"ollama_url\": ").unwrap();

        assert!(Config::save_default_model(&path, "mistral").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ \"ollama_url\": ");
    }

    #[test]
    fn test_ollama_host_env() {
        let mut config = Config::new();
        config.apply_env(Some("10.0.0.5:11434".to_string()));
        assert_eq!(config.ollama_url, "http://10.0.0.5:11434");

        config.apply_env(Some("https://ollama.internal".to_string()));
        assert_eq!(config.ollama_url, "https://ollama.internal");

        config.apply_env(Some("  ".to_string()));
        assert_eq!(config.ollama_url, "https://ollama.internal");
    }
}
