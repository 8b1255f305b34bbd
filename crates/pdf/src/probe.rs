use crate::PdfDocument;
use scrub_core::{Document, Result, TextLayerProbe};
use std::path::Path;

/// 抽样检测文本层
///
/// 检查前 `sample_pages` 页，任一页的非空白字符数达到 `min_chars` 即认为
/// 文档已有可搜索文本，不需要 OCR。
#[derive(Debug, Clone, Copy)]
pub struct SampledTextProbe {
    pub sample_pages: usize,
    pub min_chars: usize,
}

impl Default for SampledTextProbe {
    fn default() -> Self {
        Self {
            sample_pages: 5,
            min_chars: 10,
        }
    }
}

impl TextLayerProbe for SampledTextProbe {
    fn has_searchable_text(&self, path: &Path) -> Result<bool> {
        let doc = PdfDocument::load(path)?;
        let pages = doc.page_count().min(self.sample_pages.max(1));

        for index in 0..pages {
            let page = match doc.page(index) {
                Ok(page) => page,
                Err(e) => {
                    log::debug!("[TextProbe] 第 {} 页文本提取失败: {}", index + 1, e);
                    continue;
                }
            };
            let chars = page.text.chars().filter(|c| !c.is_whitespace()).count();
            if chars >= self.min_chars.max(1) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
