//! 文件系统辅助：临时路径、时间戳保存与恢复

use std::ffi::OsString;
use std::fs::{self, FileTimes, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 保存清理结果的临时兄弟文件：`<name>.tmp`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// OCR 输出的临时兄弟文件：`<stem>.ocr.pdf`
pub fn ocr_temp_path(path: &Path) -> PathBuf {
    path.with_extension("ocr.pdf")
}

/// 转为绝对路径（不解析符号链接）
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// 文件的访问/修改/创建时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamps {
    pub accessed: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub created: Option<SystemTime>,
}

impl FileStamps {
    pub fn capture(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            accessed: meta.accessed().ok(),
            modified: meta.modified().ok(),
            created: meta.created().ok(),
        })
    }

    /// 写回时间戳；创建时间仅在 Windows 上可写
    pub fn restore(&self, path: &Path) -> io::Result<()> {
        let mut times = FileTimes::new();
        if let Some(accessed) = self.accessed {
            times = times.set_accessed(accessed);
        }
        if let Some(modified) = self.modified {
            times = times.set_modified(modified);
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileTimesExt;
            if let Some(created) = self.created {
                times = times.set_created(created);
            }
        }

        let file = OpenOptions::new().write(true).open(path)?;
        file.set_times(times)
    }
}

/// 复制文件并保留时间戳
pub fn copy_with_stamps(src: &Path, dst: &Path) -> io::Result<()> {
    let stamps = FileStamps::capture(src)?;
    fs::copy(src, dst)?;
    if let Err(e) = stamps.restore(dst) {
        log::warn!("[Staging] 无法恢复 {} 的时间戳: {}", dst.display(), e);
    }
    Ok(())
}
