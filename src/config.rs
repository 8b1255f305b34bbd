use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scrub_core::{FillColor, RetryPolicy, WatermarkRules};
use scrub_ocr::OcrConfig;
use scrub_pdf::SampledTextProbe;

/// 路径中出现这些片段（小写比较）即视为云同步目录
pub const DEFAULT_CLOUD_PATTERNS: &[&str] = &[
    "onedrive",
    "dropbox",
    "google drive",
    "crossdevice",
    "icloud",
    "box sync",
    "sync",
    "cloud",
];

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// 水印规则
    pub watermark: WatermarkRules,
    /// 云同步路径特征
    pub cloud_patterns: Vec<String>,
    /// 暂存根目录，未设置时为 `~/notebooklm_staging`
    pub staging_root: Option<PathBuf>,
    pub retry: RetryConfig,
    pub ocr: OcrConfig,
    pub redaction: RedactionConfig,
    pub text_probe: TextProbeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watermark: WatermarkRules::default(),
            cloud_patterns: DEFAULT_CLOUD_PATTERNS.iter().map(|s| s.to_string()).collect(),
            staging_root: None,
            retry: RetryConfig::default(),
            ocr: OcrConfig::default(),
            redaction: RedactionConfig::default(),
            text_probe: TextProbeConfig::default(),
        }
    }
}

/// 云同步路径的重试设置
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RedactionConfig {
    /// 覆盖矩形的填充色（RGB，0-1）
    pub fill: FillColor,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct TextProbeConfig {
    pub sample_pages: usize,
    pub min_chars: usize,
}

impl Default for TextProbeConfig {
    fn default() -> Self {
        let probe = SampledTextProbe::default();
        Self {
            sample_pages: probe.sample_pages,
            min_chars: probe.min_chars,
        }
    }
}

impl TextProbeConfig {
    pub fn probe(&self) -> SampledTextProbe {
        SampledTextProbe {
            sample_pages: self.sample_pages,
            min_chars: self.min_chars,
        }
    }
}

impl AppConfig {
    /// 暂存根目录（配置优先，否则为用户主目录下的 notebooklm_staging）
    pub fn staging_root(&self) -> Option<PathBuf> {
        self.staging_root
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join("notebooklm_staging")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watermark
            .pattern()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.maxAttempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config dir unavailable")]
    NoConfigDir,
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("pdf-scrub").join("config.json"))
}

/// 加载配置
///
/// 显式指定的文件必须存在；默认位置不存在时使用默认配置。
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            path.to_path_buf()
        }
        None => match config_path() {
            Ok(path) if path.exists() => path,
            _ => return Ok(AppConfig::default()),
        },
    };

    log::info!("[Config] 读取配置 {}", path.display());
    let raw = fs::read_to_string(&path)?;
    let config: AppConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}
