//! 暂存：把处理完成的文件复制到按标签分组的目录，供之后上传

use std::path::{Path, PathBuf};

use scrub_core::{Result, RetryPolicy, ScrubError};
use scrub_text::{sanitize, unique_path};

use crate::fsutil::copy_with_stamps;

#[derive(Debug, Clone)]
pub struct Stager {
    root: PathBuf,
    label: String,
}

impl Stager {
    pub fn new(root: PathBuf, label: &str) -> Result<Self> {
        let label = sanitize(label).trim().to_string();
        if label.is_empty() {
            return Err(ScrubError::InvalidConfig(
                "staging label is empty".to_string(),
            ));
        }
        Ok(Self { root, label })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn label_dir(&self) -> PathBuf {
        self.root.join(&self.label)
    }

    /// 以 `file_name` 复制到标签目录，重名时追加序号
    pub fn stage(&self, file: &Path, file_name: &str, policy: &RetryPolicy) -> Result<PathBuf> {
        let dir = self.label_dir();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ScrubError::Staging(format!("create {}: {}", dir.display(), e)))?;

        let dest = unique_path(&dir.join(file_name));
        policy
            .run(|_| copy_with_stamps(file, &dest))
            .map_err(|e| ScrubError::Staging(e.to_string()))?;

        log::info!("[Staging] {} -> {}", file.display(), dest.display());
        Ok(dest)
    }
}
