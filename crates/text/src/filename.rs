use scrub_core::WatermarkRules;
use std::path::{Path, PathBuf};

/// Windows 文件名中不允许出现的字符
pub const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// 作者与书名之间的分隔符（下载站点用下划线代替空格）
const TITLE_AUTHOR_SEPARATOR: &str = "_-_";

/// 移除非法字符
pub fn sanitize(name: &str) -> String {
    name.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect()
}

/// 下划线转空格，连续空白合并为一个，去掉首尾空白
fn collapse(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_prefix_ci<'a>(name: &'a str, marker: &str) -> Option<&'a str> {
    let head = name.get(..marker.len())?;
    if head.eq_ignore_ascii_case(marker) {
        name.get(marker.len()..)
    } else {
        None
    }
}

fn strip_suffix_ci<'a>(name: &'a str, marker: &str) -> Option<&'a str> {
    let start = name.len().checked_sub(marker.len())?;
    let tail = name.get(start..)?;
    if tail.eq_ignore_ascii_case(marker) {
        name.get(..start)
    } else {
        None
    }
}

/// 文件名规范化
///
/// 依次执行：去站点前缀 → `Title_-_Author` 改写为 `Author - Title` →
/// 去图书馆后缀 → 合并下划线与空白 → 去非法字符。整条流水线重复执行
/// 直到结果不再变化，因此对已规范化的名称再次调用不会改变它。
#[derive(Debug, Clone)]
pub struct FilenameNormalizer {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl FilenameNormalizer {
    pub fn new(rules: &WatermarkRules) -> Self {
        let mut prefixes: Vec<String> = rules
            .filename_prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect();
        let mut suffixes: Vec<String> = rules
            .library_suffixes
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
        Self { prefixes, suffixes }
    }

    /// 规范化文件名主干（不含扩展名）
    ///
    /// 反复执行直到结果不再变化；首轮之后不再含下划线，此后每轮只会缩短名称。
    /// 结果为空时返回原名。
    pub fn normalize(&self, stem: &str) -> String {
        let mut current = self.normalize_once(stem);
        loop {
            let next = self.normalize_once(&current);
            if next == current {
                break;
            }
            current = next;
        }

        if current.is_empty() {
            stem.to_string()
        } else {
            current
        }
    }

    /// 计算重命名目标；名称无需改变时返回 `None`
    ///
    /// 目标与原文件位于同一目录，扩展名保持不变。冲突处理由调用方负责。
    pub fn rename_target(&self, path: &Path) -> Option<PathBuf> {
        let stem = path.file_stem()?.to_str()?;
        let normalized = self.normalize(stem);
        if normalized == stem {
            return None;
        }

        let file_name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", normalized, ext),
            None => normalized,
        };
        Some(path.with_file_name(file_name))
    }

    fn normalize_once(&self, name: &str) -> String {
        let mut name = name.trim().to_string();

        while let Some(rest) = self
            .prefixes
            .iter()
            .find_map(|p| strip_prefix_ci(&name, p))
        {
            name = rest.to_string();
        }

        if let Some((title, author)) = name.split_once(TITLE_AUTHOR_SEPARATOR) {
            let title = clean(title);
            // 后缀标记通常紧跟在作者之后
            let author = clean(self.strip_library_suffix(author));
            if !title.is_empty() && !author.is_empty() {
                name = format!("{} - {}", author, title);
            }
        }

        clean(self.strip_library_suffix(&name))
    }

    /// 去掉末尾所有图书馆标记（可能重复出现）
    fn strip_library_suffix<'a>(&self, name: &'a str) -> &'a str {
        let mut rest = name.trim_end();
        while let Some(stripped) = self.suffixes.iter().find_map(|s| strip_suffix_ci(rest, s)) {
            rest = stripped.trim_end();
        }
        rest
    }
}

fn clean(name: &str) -> String {
    collapse(&sanitize(name))
}
