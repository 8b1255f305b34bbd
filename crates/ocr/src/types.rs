use serde::{Deserialize, Serialize};

/// ocrmypdf 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct OcrConfig {
    /// ocrmypdf 可执行文件路径
    pub binary_path: Option<String>,
    /// 语言（如 "eng" 或 "eng+deu"）
    pub language: Option<String>,
    /// 优化级别 (0-3)
    pub optimize: Option<u8>,
}

impl OcrConfig {
    pub fn binary_or_default(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("ocrmypdf")
    }

    pub fn language_or_default(&self) -> &str {
        self.language.as_deref().unwrap_or("eng")
    }

    pub fn optimize_or_default(&self) -> u8 {
        self.optimize.unwrap_or(1).min(3)
    }
}

/// ocrmypdf 安装状态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrStatus {
    pub installed: bool,
    pub version: Option<String>,
    pub binary_path: String,
    pub error: Option<String>,
}

impl OcrStatus {
    /// 一行说明，用于提示 OCR 为何不可用
    pub fn describe(&self) -> String {
        match (self.installed, &self.version, &self.error) {
            (true, Some(version), _) => format!("ocrmypdf {} ({})", version, self.binary_path),
            (true, None, _) => format!("ocrmypdf ({})", self.binary_path),
            (false, _, Some(error)) => format!("{} not usable: {}", self.binary_path, error),
            (false, _, None) => format!("{} not installed", self.binary_path),
        }
    }
}

/// OCR 审计信息（写入事件日志）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrAuditInfo {
    pub engine: String,
    pub engine_version: Option<String>,
    pub engine_params: Option<String>,
}
