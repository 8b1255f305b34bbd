//! ocrmypdf 引擎实现（CLI 包装）

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::types::{OcrAuditInfo, OcrConfig, OcrStatus};

/// ocrmypdf 引擎
pub struct OcrMyPdfEngine {
    config: OcrConfig,
    version: Option<String>,
}

impl OcrMyPdfEngine {
    /// 创建引擎，验证 binary 是否可用
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        let status = detect_ocrmypdf_status(&config);
        Self::from_status(config, &status)
    }

    /// 根据已检测的安装状态创建引擎
    pub fn from_status(config: OcrConfig, status: &OcrStatus) -> Result<Self, OcrError> {
        if !status.installed {
            return Err(OcrError::NotInstalled(status.describe()));
        }

        log::info!(
            "[OCR] ocrmypdf 初始化成功，版本: {}",
            status.version.as_deref().unwrap_or("unknown")
        );

        Ok(Self {
            config,
            version: status.version.clone(),
        })
    }

    /// 构建命令参数：已有文本的页面跳过，轻度优化，输出普通 PDF
    fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "--skip-text".into(),
            "--optimize".into(),
            self.config.optimize_or_default().to_string().into(),
            "--output-type".into(),
            "pdf".into(),
            "-l".into(),
            self.config.language_or_default().into(),
            input.as_os_str().to_os_string(),
            output.as_os_str().to_os_string(),
        ]
    }
}

impl OcrEngine for OcrMyPdfEngine {
    fn ocr_pdf(&mut self, input: &Path, output: &Path) -> Result<(), OcrError> {
        let start = Instant::now();
        let args = self.build_args(input, output);

        log::info!(
            "[OCR] 执行: {} {}",
            self.config.binary_or_default(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let result = Command::new(self.config.binary_or_default())
            .args(&args)
            .output()
            .map_err(|e| OcrError::NotInstalled(format!("无法执行 ocrmypdf: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(OcrError::Failed(last_lines(&stderr, 3)));
        }

        if !output.exists() {
            return Err(OcrError::Failed("ocrmypdf 未生成输出文件".to_string()));
        }

        log::info!(
            "[OCR] 识别完成，耗时: {} ms",
            start.elapsed().as_millis()
        );
        Ok(())
    }

    fn audit_info(&self) -> OcrAuditInfo {
        let params = serde_json::json!({
            "language": self.config.language_or_default(),
            "optimize": self.config.optimize_or_default(),
            "skipText": true,
        });

        OcrAuditInfo {
            engine: "ocrmypdf".to_string(),
            engine_version: self.version.clone(),
            engine_params: Some(params.to_string()),
        }
    }
}

/// 错误输出只保留最后几行
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    let tail = lines[start..].join(" | ");
    if tail.is_empty() {
        "ocrmypdf exited with failure".to_string()
    } else {
        tail
    }
}

/// 解析版本号（通常在第一行，格式如 "16.4.2" 或 "ocrmypdf 16.4.2"）
fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.split_whitespace().last())
        .map(|v| v.trim_start_matches('v').to_string())
}

/// 获取 ocrmypdf 版本
pub fn get_ocrmypdf_version(binary_path: &str) -> Result<String, OcrError> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::NotInstalled(format!("无法执行 {}: {}", binary_path, e)))?;

    if !output.status.success() {
        return Err(OcrError::NotInstalled(format!(
            "{} --version 执行失败",
            binary_path
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    Ok(parse_version(&combined).unwrap_or_else(|| "unknown".to_string()))
}

/// 检测 ocrmypdf 安装状态
pub fn detect_ocrmypdf_status(config: &OcrConfig) -> OcrStatus {
    let binary_path = config.binary_or_default().to_string();
    match get_ocrmypdf_version(&binary_path) {
        Ok(version) => OcrStatus {
            installed: true,
            version: Some(version),
            binary_path,
            error: None,
        },
        Err(e) => OcrStatus {
            installed: false,
            version: None,
            binary_path,
            error: Some(e.to_string()),
        },
    }
}
