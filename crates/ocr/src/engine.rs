//! OCR 引擎 trait 定义

use crate::error::OcrError;
use crate::types::OcrAuditInfo;
use std::path::Path;

/// OCR 引擎统一 trait
pub trait OcrEngine: Send {
    /// 为 `input` 添加文本层，结果写入 `output`
    ///
    /// 成功时 `output` 为完整的 PDF；失败时调用方负责清理 `output`。
    fn ocr_pdf(&mut self, input: &Path, output: &Path) -> Result<(), OcrError>;

    /// 获取审计信息
    fn audit_info(&self) -> OcrAuditInfo;
}
