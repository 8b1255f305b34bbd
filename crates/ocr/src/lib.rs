//! 扫描版 PDF 的文本层补全
//!
//! 通过外部 `ocrmypdf` 命令为没有可搜索文本的 PDF 添加文本层

mod engine;
mod error;
mod ocrmypdf;
mod types;

pub use engine::OcrEngine;
pub use error::OcrError;
pub use ocrmypdf::{detect_ocrmypdf_status, get_ocrmypdf_version, OcrMyPdfEngine};
pub use types::{OcrAuditInfo, OcrConfig, OcrStatus};
