use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Generate endpoint URL (Ollama-compatible `/api/generate`).
    #[serde(default = "default_model_url")]
    pub url: String,
    /// Model identifier sent with every prompt.
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Optional request timeout. Absent means no client-side timeout:
    /// the call waits as long as the model takes.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_model_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}
fn default_model_name() -> String {
    "gemma2:2b".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: default_model_url(),
            name: default_model_name(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the extracted-content, summary, and transcript files.
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load the config at `path`, falling back to built-in defaults when the
/// file does not exist. A file that exists but fails to parse is still an
/// error — silent fallback would mask typos.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.model.url.is_empty() {
        anyhow::bail!("model.url must not be empty");
    }
    if !config.model.url.starts_with("http://") && !config.model.url.starts_with("https://") {
        anyhow::bail!(
            "model.url must be an http(s) URL, got '{}'",
            config.model.url
        );
    }
    if config.model.name.is_empty() {
        anyhow::bail!("model.name must not be empty");
    }
    if config.model.timeout_secs == Some(0) {
        anyhow::bail!("model.timeout_secs must be > 0 when set");
    }
    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_ollama() {
        let config = Config::default();
        assert_eq!(config.model.url, "http://localhost:11434/api/generate");
        assert_eq!(config.model.name, "gemma2:2b");
        assert_eq!(config.model.timeout_secs, None);
        assert_eq!(config.storage.dir, PathBuf::from("."));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [model]
            name = "llama3.2:3b"
            "#,
        )
        .unwrap();
        assert_eq!(config.model.name, "llama3.2:3b");
        assert_eq!(config.model.url, "http://localhost:11434/api/generate");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn rejects_zero_timeout() {
        let config: Config = toml::from_str(
            r#"
            [model]
            timeout_secs = 0
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        let config: Config = toml::from_str(
            r#"
            [model]
            url = "localhost:11434"
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_or_default(Path::new("/nonexistent/study.toml")).unwrap();
        assert_eq!(config.model.name, "gemma2:2b");
    }
}
