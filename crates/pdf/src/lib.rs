//! 基于 lopdf 的 PDF 文档实现

mod annotations;
mod content;
mod fonts;
mod probe;
mod utils;

pub use probe::SampledTextProbe;

use content::{redact_content, PageText};
use fonts::FontSet;
use lopdf::content::Content;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use scrub_core::{
    Document, FillColor, Match, Page, Result, ScrubError, WatermarkPattern, WatermarkRules,
};
use std::path::Path;

/// lopdf 文档
pub struct PdfDocument {
    doc: lopdf::Document,
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn from_document(doc: lopdf::Document) -> Self {
        let pages = doc.page_iter().collect();
        Self { doc, pages }
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| ScrubError::Redaction {
                page: index,
                reason: format!("page index out of range (document has {})", self.pages.len()),
            })
    }

    /// 解码页面文字（按页面字体）
    fn page_text(&self, index: usize) -> Result<PageText> {
        let content = self.decode_page(index)?;
        let fonts = FontSet::for_page(&self.doc, self.page_id(index)?);
        Ok(PageText::from_content(&content, &fonts))
    }

    fn decode_page(&self, index: usize) -> Result<Content> {
        let page_id = self.page_id(index)?;
        let data = utils::get_page_content(&self.doc, page_id).map_err(|reason| {
            ScrubError::Redaction {
                page: index,
                reason,
            }
        })?;
        Content::decode(&data).map_err(|e| ScrubError::Redaction {
            page: index,
            reason: format!("content stream: {}", e),
        })
    }
}

impl Document for PdfDocument {
    fn load(path: &Path) -> Result<Self> {
        let doc = lopdf::Document::load(path).map_err(|e| ScrubError::Open(e.to_string()))?;
        let pdf = Self::from_document(doc);
        log::debug!("[PDF] 已加载 {:?}，共 {} 页", path, pdf.pages.len());
        Ok(pdf)
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<Page> {
        Ok(Page {
            index,
            text: self.page_text(index)?.text().to_string(),
        })
    }

    fn find_watermark(&self, index: usize, pattern: &WatermarkPattern) -> Result<Vec<Match>> {
        Ok(self.page_text(index)?.find(index, pattern))
    }

    fn remove_watermark_links(&mut self, index: usize, rules: &WatermarkRules) -> Result<usize> {
        let page_id = self.page_id(index)?;
        annotations::remove_watermark_links(&mut self.doc, page_id, rules)
            .map_err(|reason| ScrubError::Redaction { page: index, reason })
    }

    fn redact(&mut self, index: usize, matches: &[Match], fill: FillColor) -> Result<usize> {
        if matches.is_empty() {
            return Ok(0);
        }

        let page_id = self.page_id(index)?;
        let content = self.decode_page(index)?;
        let data = redact_content(content, matches, fill)
            .encode()
            .map_err(|e| ScrubError::Redaction {
                page: index,
                reason: format!("encode content stream: {}", e),
            })?;

        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), data));
        match self.doc.get_object_mut(page_id) {
            Ok(Object::Dictionary(ref mut dict)) => {
                dict.set("Contents", Object::Reference(stream_id));
            }
            _ => {
                return Err(ScrubError::Redaction {
                    page: index,
                    reason: "page object is not a dictionary".to_string(),
                })
            }
        }

        log::info!("[Redact] 第 {} 页涂抹 {} 处水印", index + 1, matches.len());
        Ok(matches.len())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.doc.prune_objects();
        self.doc.compress();
        self.doc
            .save(path)
            .map_err(|e| ScrubError::Save(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}
