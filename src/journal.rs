//! 断点续跑日志
//!
//! 事件以 JSON Lines 追加写入 `<prefix>_log_<时间>.jsonl`；已成功处理的文件
//! 集合保存在同目录的 `processed_files.json`，每处理完一个文件立即整体重写。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::fsutil::{absolute_path, temp_path};

pub const RESUME_FILE_NAME: &str = "processed_files.json";
pub const JOURNAL_PREFIX: &str = "pdfscrub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Cleaned,
    Renamed,
    Ocr,
    Uploaded,
    Failed,
    Skipped,
}

/// 单条事件记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub timestamp: String,
    pub event: EventKind,
    pub file: String,
    pub details: serde_json::Value,
}

impl EventLogEntry {
    pub fn new(event: EventKind, file: &Path, details: serde_json::Value) -> Self {
        let file = absolute_path(file).unwrap_or_else(|_| file.to_path_buf());
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            event,
            file: file.to_string_lossy().into_owned(),
            details,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("resume file {path} is unreadable: {source}")]
    CorruptResumeFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 追加写入的事件日志
pub struct EventJournal {
    path: PathBuf,
    file: File,
}

impl EventJournal {
    pub fn create(path: PathBuf) -> Result<Self, JournalError> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &EventLogEntry) -> io::Result<()> {
        let mut line = serde_json::to_vec(entry).map_err(io::Error::other)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResumeFile {
    processed: BTreeSet<String>,
}

/// 已处理文件集合（绝对路径）
#[derive(Debug)]
pub struct ProcessedSet {
    path: PathBuf,
    entries: BTreeSet<String>,
}

impl ProcessedSet {
    /// 读取集合；文件不存在时为空，内容损坏时报错而不是覆盖
    pub fn load(path: PathBuf) -> Result<Self, JournalError> {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => {
                let parsed: ResumeFile = serde_json::from_str(&raw).map_err(|source| {
                    JournalError::CorruptResumeFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                parsed.processed
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn contains(&self, file: &Path) -> bool {
        self.entries.contains(&identity(file))
    }

    pub fn insert(&mut self, file: &Path) -> bool {
        self.entries.insert(identity(file))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 整体重写，先写临时文件再替换
    pub fn flush(&self) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(&ResumeFile {
            processed: self.entries.clone(),
        })
        .map_err(io::Error::other)?;
        let tmp = temp_path(&self.path);
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)
    }
}

fn identity(file: &Path) -> String {
    absolute_path(file)
        .unwrap_or_else(|_| file.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// 日志目录：事件日志 + 已处理集合
pub struct ResumeLog {
    journal: EventJournal,
    processed: ProcessedSet,
}

impl ResumeLog {
    pub fn open(dir: &Path) -> Result<Self, JournalError> {
        fs::create_dir_all(dir)?;
        let processed = ProcessedSet::load(dir.join(RESUME_FILE_NAME))?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let journal = EventJournal::create(dir.join(format!("{}_log_{}.jsonl", JOURNAL_PREFIX, stamp)))?;

        log::info!(
            "[Resume] 日志 {}，已处理 {} 个文件",
            journal.path().display(),
            processed.len()
        );
        Ok(Self { journal, processed })
    }

    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn is_processed(&self, file: &Path) -> bool {
        self.processed.contains(file)
    }

    /// 追加事件；写入失败只记录警告
    pub fn record(&mut self, entry: EventLogEntry) {
        if let Err(e) = self.journal.append(&entry) {
            log::warn!("[Resume] 写入事件日志失败: {}", e);
        }
    }

    /// 标记为已处理并立即落盘
    pub fn mark_processed(&mut self, file: &Path) {
        if !self.processed.insert(file) {
            return;
        }
        if let Err(e) = self.processed.flush() {
            log::warn!("[Resume] 无法更新已处理列表: {}", e);
        }
    }
}
