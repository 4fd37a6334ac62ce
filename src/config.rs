// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.yaml";
const DEV_JWT_SECRET: &str = "jwt-secret-change-in-production";

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Settings handed explicitly to the scorer. Nothing in `matching` reads the
/// process environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl LlmSettings {
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub upload_path: PathBuf,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: u64,
    pub scrape_timeout_seconds: u64,
    pub llm: LlmSettings,
    #[serde(skip)]
    pub jwt_secret: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/resumeranker.db"),
            upload_path: PathBuf::from("uploads"),
            port: 3001,
            cors_origins: vec!["http://localhost:5173".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            scrape_timeout_seconds: 30,
            llm: LlmSettings::default(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: Option<AppConfig>,
    production: Option<AppConfig>,
}

impl AppConfig {
    /// Load `config.yaml` (if present) for the active environment, then apply
    /// environment variable overrides and resolve relative paths.
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let config_path = PathBuf::from(CONFIG_FILE);
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path, &environment)?
        } else {
            warn!("{} not found, using built-in defaults", CONFIG_FILE);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.resolve_paths()?;
        Ok(config)
    }

    /// `RESUMERANKER_ENV`, then `ENVIRONMENT`, then `local`.
    pub fn get_environment() -> String {
        Self::environment_from(|key| std::env::var(key).ok())
    }

    fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> String {
        lookup("RESUMERANKER_ENV")
            .or_else(|| lookup("ENVIRONMENT"))
            .unwrap_or_else(|| "local".to_string())
    }

    pub fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;

        let selected = match environment {
            "production" => file.production,
            _ => file.local,
        };

        Ok(selected.unwrap_or_default())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }

        if let Ok(port) = std::env::var("ROCKET_PORT") {
            self.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }

        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => self.jwt_secret = secret,
            _ => {
                warn!("JWT_SECRET not set, using development secret");
                self.jwt_secret = DEV_JWT_SECRET.to_string();
            }
        }

        self.llm.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());

        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.llm.model = model;
        }

        Ok(())
    }

    fn resolve_paths(&mut self) -> Result<()> {
        self.database_path = Self::resolve_path(&self.database_path)?;
        self.upload_path = Self::resolve_path(&self.upload_path)?;
        Ok(())
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    /// Ensure the upload directory and the database parent directory exist
    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_path)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.upload_path.display()))?;

        if let Some(db_parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(db_parent).await.with_context(|| {
                format!("Failed to create database directory: {}", db_parent.display())
            })?;
        }

        info!("All configured directories ensured to exist");
        Ok(())
    }
}
