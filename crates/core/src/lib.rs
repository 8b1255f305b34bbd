//! Core model shared by the scrub pipeline: documents, watermark rules, retry.

pub mod document;
pub mod retry;
pub mod rules;

pub use document::{Document, Match, MatchSegment, Page, Rect, TextLayerProbe};
pub use retry::{RetryError, RetryPolicy};
pub use rules::{TextMatch, WatermarkPattern, WatermarkRules};

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, ScrubError>;

/// 单个文件处理失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Open,
    Redaction,
    Save,
    TransientIo,
    Io,
    Rename,
    Ocr,
    Staging,
    Config,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Open => "open",
            FailureKind::Redaction => "redaction",
            FailureKind::Save => "save",
            FailureKind::TransientIo => "transient_io",
            FailureKind::Io => "io",
            FailureKind::Rename => "rename",
            FailureKind::Ocr => "ocr",
            FailureKind::Staging => "staging",
            FailureKind::Config => "config",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrubError {
    #[error("open failed: {0}")]
    Open(String),
    #[error("redaction failed on page {page}: {reason}")]
    Redaction { page: usize, reason: String },
    #[error("save failed: {0}")]
    Save(String),
    #[error("cloud I/O still failing after {attempts} attempts: {source}")]
    TransientIo {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rename failed: {0}")]
    Rename(String),
    #[error("ocr failed: {0}")]
    Ocr(String),
    #[error("staging failed: {0}")]
    Staging(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScrubError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScrubError::Open(_) => FailureKind::Open,
            ScrubError::Redaction { .. } => FailureKind::Redaction,
            ScrubError::Save(_) => FailureKind::Save,
            ScrubError::TransientIo { .. } => FailureKind::TransientIo,
            ScrubError::Io(_) => FailureKind::Io,
            ScrubError::Rename(_) => FailureKind::Rename,
            ScrubError::Ocr(_) => FailureKind::Ocr,
            ScrubError::Staging(_) => FailureKind::Staging,
            ScrubError::InvalidConfig(_) => FailureKind::Config,
        }
    }
}

/// RGB 填充色，分量范围 0-1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillColor(pub [f32; 3]);

impl FillColor {
    pub const WHITE: FillColor = FillColor([1.0, 1.0, 1.0]);
    pub const BLACK: FillColor = FillColor([0.0, 0.0, 0.0]);

    /// 分量限制在 0-1 之间
    pub fn clamped(self) -> Self {
        let [r, g, b] = self.0;
        FillColor([r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)])
    }
}

impl Default for FillColor {
    fn default() -> Self {
        FillColor::WHITE
    }
}
