use std::{fs, path::Path, path::PathBuf, sync::Mutex};

use serde::{Deserialize, Serialize};

use crate::models::Coordinate;
use crate::utils;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:1234/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORT: u16 = 8384;

/// Used when the client's position is denied or unavailable (Harare).
pub const FALLBACK_LOCATION: Coordinate = Coordinate::new(-17.8216, 31.0492);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    /// Environment variables win over the stored file.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("LLM_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.model = model;
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(temperature) = lookup("LLM_TEMPERATURE").and_then(|s| s.parse::<f32>().ok()) {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = lookup("LLM_MAX_TOKENS").and_then(|s| s.parse::<u32>().ok()) {
            self.max_tokens = max_tokens;
        }
        if let Some(timeout) = lookup("LLM_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            self.timeout_secs = timeout;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    pub fallback_location: Coordinate,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            fallback_location: FALLBACK_LOCATION,
            llm: LlmConfig::default(),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::default_layout().config_path())
    }

    pub fn load_from(path: PathBuf) -> Self {
        let data = read_config(&path).unwrap_or_else(|err| {
            tracing::warn!("failed to read config {:?}, using defaults: {err}", path);
            AppConfig::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Stored config with environment overrides applied.
    pub fn effective(&self) -> Result<AppConfig, String> {
        let mut config = self.read()?;
        config.llm = config.llm.with_env_overrides();
        if let Some(port) = std::env::var("LOCAL_PULSE_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
        {
            config.port = port;
        }
        Ok(config)
    }

    pub fn read(&self) -> Result<AppConfig, String> {
        self.data
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| "config mutex poisoned".to_string())
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, String>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| "config mutex poisoned".to_string())?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&contents).map_err(|err| err.to_string())
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    utils::ensure_parent(path).map_err(|err| err.to_string())?;
    let contents = serde_json::to_string_pretty(config).map_err(|err| err.to_string())?;
    fs::write(path, contents).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load_from(dir.path().join("config.json"));
        assert_eq!(store.read().unwrap(), AppConfig::default());
    }

    #[test]
    fn update_persists_and_partial_files_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::load_from(path.clone());
        store.update(|config| config.port = 9000).unwrap();

        let reloaded = ConfigStore::load_from(path.clone());
        assert_eq!(reloaded.read().unwrap().port, 9000);

        fs::write(&path, r#"{"llm": {"model": "local-model"}}"#).unwrap();
        let partial = ConfigStore::load_from(path).read().unwrap();
        assert_eq!(partial.llm.model, "local-model");
        assert_eq!(partial.llm.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(partial.fallback_location, FALLBACK_LOCATION);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{oops").unwrap();
        assert_eq!(ConfigStore::load_from(path).read().unwrap(), AppConfig::default());
    }

    #[test]
    fn overrides_replace_and_ignore_garbage() {
        let env: HashMap<&str, &str> = [
            ("LLM_MODEL", "gemini-2.5-flash"),
            ("LLM_API_KEY", "secret"),
            ("LLM_TEMPERATURE", "warm"),
            ("LLM_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();

        let mut config = LlmConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}
