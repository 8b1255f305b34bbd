//! OCR 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR 工具不可用: {0}")]
    NotInstalled(String),

    #[error("OCR 执行失败: {0}")]
    Failed(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
