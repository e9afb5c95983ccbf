mod file_config;

pub use file_config::{FileConfig, LlmConfig};

use crate::llm::ApiKeySource;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub llm_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    pub llm: LlmSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub credential: ApiKeySource,
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let llm = resolve_llm(cli, file.llm.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            llm,
        })
    }

    pub fn content_db_path(&self) -> PathBuf {
        self.db_dir.join("content.db")
    }
}

fn resolve_llm(cli: &CliConfig, file: LlmConfig) -> Result<LlmSettings> {
    let base_url = file
        .base_url
        .or_else(|| cli.llm_base_url.clone())
        .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());
    if base_url.trim().is_empty() {
        bail!("llm.base_url must not be empty");
    }

    let model = file
        .model
        .or_else(|| cli.llm_model.clone())
        .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
    if model.trim().is_empty() {
        bail!("llm.model must not be empty");
    }

    let timeout_secs = file
        .timeout_secs
        .or(cli.llm_timeout_secs)
        .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
    if timeout_secs == 0 {
        bail!("llm.timeout_secs must be greater than zero");
    }

    // A key command beats a static key within the same source
    let credential = non_blank(file.api_key_command)
        .map(ApiKeySource::Command)
        .or_else(|| non_blank(file.api_key).map(ApiKeySource::Static))
        .or_else(|| non_blank(cli.api_key_command.clone()).map(ApiKeySource::Command))
        .or_else(|| non_blank(cli.api_key.clone()).map(ApiKeySource::Static))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No API key configured: set --api-key, OPENAI_API_KEY, llm.api_key or llm.api_key_command"
            )
        })?;

    Ok(LlmSettings {
        base_url,
        model,
        credential,
        timeout_secs,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
