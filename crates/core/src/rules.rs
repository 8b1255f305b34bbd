//! 水印规则
//!
//! 定义要清除的水印文字、链接域名以及文件名中的前缀/后缀标记，
//! 并把文字规则编译为容忍空格插入的匹配器。

use crate::{Result, ScrubError};
use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// 水印规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkRules {
    /// 页面文字中的水印短语
    pub text_phrases: Vec<String>,
    /// 链接注释 URI 中的水印域名（大小写不敏感）
    pub link_domains: Vec<String>,
    /// 文件名开头的站点前缀
    pub filename_prefixes: Vec<String>,
    /// 文件名末尾的图书馆标记
    pub library_suffixes: Vec<String>,
}

impl Default for WatermarkRules {
    fn default() -> Self {
        Self {
            text_phrases: vec!["OceanofPDFs.com".to_string(), "OceanofPDF.com".to_string()],
            link_domains: vec!["oceanofpdfs.com".to_string(), "oceanofpdf.com".to_string()],
            filename_prefixes: vec!["_OceanofPDFs.com_".to_string(), "_OceanofPDF.com_".to_string()],
            library_suffixes: vec!["(Z-Library)".to_string(), "(z-lib.org)".to_string()],
        }
    }
}

impl WatermarkRules {
    /// 编译文字匹配器
    pub fn pattern(&self) -> Result<WatermarkPattern> {
        WatermarkPattern::new(&self.text_phrases)
    }

    /// URI 是否指向水印域名
    pub fn uri_matches(&self, uri: &str) -> bool {
        let uri = uri.to_lowercase();
        self.link_domains
            .iter()
            .filter(|d| !d.trim().is_empty())
            .any(|d| uri.contains(&d.trim().to_lowercase()))
    }
}

/// 文本中的一次命中（字节区间）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub start: usize,
    pub end: usize,
}

/// 水印文字匹配器
///
/// 大小写不敏感，相邻字符之间允许任意空白，例如 "O c e a n o f P D F s . c o m"。
/// 返回字节区间，调用方负责把区间映射回内容流中的字符编码。
#[derive(Debug, Clone)]
pub struct WatermarkPattern {
    regex: Regex,
}

impl WatermarkPattern {
    pub fn new(phrases: &[String]) -> Result<Self> {
        let mut alternatives: Vec<String> = phrases
            .iter()
            .map(|p| spaced_phrase(p))
            .filter(|p| !p.is_empty())
            .collect();

        if alternatives.is_empty() {
            return Err(ScrubError::InvalidConfig(
                "at least one watermark phrase is required".to_string(),
            ));
        }

        // 较长的短语优先，避免 "OceanofPDF.com" 抢先截断 "OceanofPDFs.com"
        alternatives.sort_by_key(|p| std::cmp::Reverse(p.len()));
        alternatives.dedup();

        let source = format!("(?:{})", alternatives.join("|"));
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| ScrubError::InvalidConfig(e.to_string()))?;

        Ok(Self { regex })
    }

    /// 查找所有命中
    pub fn find(&self, haystack: &[u8]) -> Vec<TextMatch> {
        self.regex
            .find_iter(haystack)
            .map(|m| TextMatch {
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }

    pub fn find_str(&self, text: &str) -> Vec<TextMatch> {
        self.find(text.as_bytes())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text.as_bytes())
    }
}

/// 把短语转换为字符间允许空白的正则
fn spaced_phrase(phrase: &str) -> String {
    phrase
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| regex::escape(&c.to_string()))
        .collect::<Vec<_>>()
        .join(r"\s*")
}
