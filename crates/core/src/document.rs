//! 统一文档接口定义
//!
//! 文件处理器通过 `Document` trait 操作文档，PDF 实现位于 `scrub-pdf`。

use crate::rules::{WatermarkPattern, WatermarkRules};
use crate::{FillColor, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 页面数据结构
///
/// 页码从 0 开始，`text` 为按内容流顺序拼接的文本。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub text: String,
}

/// PDF 用户空间中的矩形（左下角 + 宽高）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.x.min(other.x);
        let bottom = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let top = (self.y + self.height).max(other.y + other.height);
        Rect {
            x: left,
            y: bottom,
            width: right - left,
            height: top - bottom,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// 命中在某个文本显示操作中的字节区间（按字符编码边界对齐）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSegment {
    /// 内容流中的操作序号
    pub op_index: usize,
    pub start: usize,
    pub end: usize,
    /// 每个字符编码的字节数（复合字体为 2）
    pub code_width: usize,
}

/// 页面上的一次水印命中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub page: usize,
    pub text: String,
    pub bbox: Rect,
    /// 一次命中可能跨越多个 Tj/TJ 操作
    pub segments: Vec<MatchSegment>,
}

/// 统一文档接口
///
/// 文件处理器只依赖这些方法，便于在测试中替换为内存实现。
pub trait Document: Sized {
    /// 加载文档
    ///
    /// 文件损坏或格式无法识别时返回 `ScrubError::Open`。
    fn load(path: &Path) -> Result<Self>;

    /// 页数
    fn page_count(&self) -> usize;

    /// 提取单页文本
    fn page(&self, index: usize) -> Result<Page>;

    /// 在单页中查找水印
    ///
    /// 内容流无法解析时返回错误，调用方将该页视为零命中。
    fn find_watermark(&self, index: usize, pattern: &WatermarkPattern) -> Result<Vec<Match>>;

    /// 删除指向水印域名的链接注释，返回删除数量
    fn remove_watermark_links(&mut self, index: usize, rules: &WatermarkRules) -> Result<usize>;

    /// 对命中区域执行涂抹：移除底层文字并绘制不透明矩形
    fn redact(&mut self, index: usize, matches: &[Match], fill: FillColor) -> Result<usize>;

    /// 保存到指定路径
    fn save(&mut self, path: &Path) -> Result<()>;
}

/// 判断文档是否已有可搜索文本层（决定是否需要 OCR）
pub trait TextLayerProbe {
    fn has_searchable_text(&self, path: &Path) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_union() {
        let a = Rect {
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 5.0,
        };
        let b = Rect {
            x: 25.0,
            y: 8.0,
            width: 20.0,
            height: 5.0,
        };
        let u = a.union(&b);
        assert_eq!(u.x, 10.0);
        assert_eq!(u.y, 8.0);
        assert_eq!(u.width, 35.0);
        assert_eq!(u.height, 7.0);
        assert!(!u.is_empty());
    }
}
