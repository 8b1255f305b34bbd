//! PDF Scrub：批量清除 PDF 水印并规范化文件名

pub mod abort;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod fsutil;
pub mod journal;
pub mod processor;
pub mod report;
pub mod staging;

pub use abort::{AbortSignal, KeyListener, LineListener};
pub use config::{config_path, load_config, save_config, AppConfig, ConfigError};
pub use discovery::{Candidate, CloudClassifier, Discovery, PatternCloudClassifier};
pub use driver::{BatchDriver, DispatchMode};
pub use journal::{EventKind, EventLogEntry, ResumeLog};
pub use processor::{FileProcessor, FileRecord, OcrStage, ProcessOptions};
pub use report::{Reporter, RunSummary};
pub use staging::Stager;
