//! PDF 文件发现与云同步分类

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::abort::AbortSignal;

/// 判断路径是否位于云同步目录
pub trait CloudClassifier {
    fn is_cloud(&self, path: &Path) -> bool;
}

/// 按路径片段判断（小写比较），Windows 上另外检查占位文件属性
#[derive(Debug, Clone)]
pub struct PatternCloudClassifier {
    patterns: Vec<String>,
}

impl PatternCloudClassifier {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

impl CloudClassifier for PatternCloudClassifier {
    fn is_cloud(&self, path: &Path) -> bool {
        let lower = path.to_string_lossy().to_lowercase();
        self.patterns.iter().any(|p| lower.contains(p.as_str())) || is_cloud_placeholder(path)
    }
}

#[cfg(windows)]
fn is_cloud_placeholder(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_OFFLINE: u32 = 0x0000_1000;
    const FILE_ATTRIBUTE_RECALL_ON_OPEN: u32 = 0x0004_0000;
    const FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS: u32 = 0x0040_0000;

    std::fs::symlink_metadata(path)
        .map(|m| {
            m.file_attributes()
                & (FILE_ATTRIBUTE_OFFLINE
                    | FILE_ATTRIBUTE_RECALL_ON_OPEN
                    | FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS)
                != 0
        })
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn is_cloud_placeholder(_path: &Path) -> bool {
    false
}

/// 发现的候选文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub cloud: bool,
}

/// 发现过程中的事件
#[derive(Debug)]
pub enum DiscoveryEvent<'a> {
    /// 进入目录（`found` 为目前已发现的文件数）
    Directory { path: &'a Path, found: usize },
    File(Candidate),
}

/// 发现结果（批量模式）
#[derive(Debug, Default)]
pub struct Discovered {
    pub local: Vec<Candidate>,
    pub cloud: Vec<Candidate>,
    pub aborted: bool,
}

impl Discovered {
    pub fn total(&self) -> usize {
        self.local.len() + self.cloud.len()
    }

    /// 本地文件在前，云同步文件在后
    pub fn into_ordered(self) -> Vec<Candidate> {
        let mut all = self.local;
        all.extend(self.cloud);
        all
    }
}

pub struct Discovery<'a> {
    classifier: &'a dyn CloudClassifier,
    abort: AbortSignal,
    extension: String,
}

impl<'a> Discovery<'a> {
    pub fn new(classifier: &'a dyn CloudClassifier, abort: AbortSignal) -> Self {
        Self {
            classifier,
            abort,
            extension: "pdf".to_string(),
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false);
        // OCR 临时输出不作为候选
        let is_ocr_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase().ends_with(".ocr.pdf"))
            .unwrap_or(false);
        is_pdf && !is_ocr_temp
    }

    fn candidate(&self, path: PathBuf) -> Candidate {
        let cloud = self.classifier.is_cloud(&path);
        Candidate { path, cloud }
    }

    /// 遍历所有根路径，每个事件回调一次；返回是否被中止
    ///
    /// 中止信号在每个目录项之间检查。
    pub fn walk<F>(&self, roots: &[PathBuf], mut on_event: F) -> bool
    where
        F: FnMut(DiscoveryEvent<'_>),
    {
        let mut found = 0usize;

        for root in roots {
            if self.abort.is_raised() {
                return true;
            }

            if root.is_file() {
                if self.matches_extension(root) {
                    found += 1;
                    on_event(DiscoveryEvent::File(self.candidate(root.clone())));
                } else {
                    log::warn!("[Discovery] 跳过非 PDF 文件: {}", root.display());
                }
                continue;
            }

            for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
                if self.abort.is_raised() {
                    return true;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("[Discovery] 无法读取目录项: {}", e);
                        continue;
                    }
                };

                if entry.file_type().is_dir() {
                    on_event(DiscoveryEvent::Directory {
                        path: entry.path(),
                        found,
                    });
                } else if entry.file_type().is_file() && self.matches_extension(entry.path()) {
                    found += 1;
                    on_event(DiscoveryEvent::File(self.candidate(entry.into_path())));
                }
            }
        }

        self.abort.is_raised()
    }

    /// 先完整发现，再按本地/云同步分组
    pub fn collect<F>(&self, roots: &[PathBuf], mut on_directory: F) -> Discovered
    where
        F: FnMut(&Path, usize),
    {
        let mut discovered = Discovered::default();
        let aborted = self.walk(roots, |event| match event {
            DiscoveryEvent::Directory { path, found } => on_directory(path, found),
            DiscoveryEvent::File(candidate) => {
                if candidate.cloud {
                    discovered.cloud.push(candidate);
                } else {
                    discovered.local.push(candidate);
                }
            }
        });
        discovered.aborted = aborted;

        log::info!(
            "[Discovery] 共发现 {} 个 PDF（本地 {}，云同步 {}）{}",
            discovered.total(),
            discovered.local.len(),
            discovered.cloud.len(),
            if discovered.aborted { "，扫描已中止" } else { "" }
        );
        discovered
    }
}
