//! 单文件处理
//!
//! 打开 → 扫描 → 涂抹 → 保存到临时文件 → 原子替换 → 恢复时间戳 → 重命名 →
//! OCR → 暂存。任何一步失败都转换为 `FileRecord` 中的错误，不会向上传播。

use std::fs::{self, File};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scrub_core::{
    Document, FailureKind, FillColor, Result, RetryPolicy, ScrubError, TextLayerProbe,
    WatermarkPattern, WatermarkRules,
};
use scrub_ocr::OcrEngine;
use scrub_text::{unique_path, FilenameNormalizer};

use crate::discovery::Candidate;
use crate::fsutil::{ocr_temp_path, temp_path, FileStamps};
use crate::staging::Stager;

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub dry_run: bool,
    pub links_only: bool,
    pub no_rename: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// 已有文本层，无需 OCR
    NotNeeded,
    Applied,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingOutcome {
    Copied(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// 单个文件的处理结果
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    /// 重命名后的路径（未重命名时与 `path` 相同）
    pub final_path: PathBuf,
    pub cloud: bool,
    pub dry_run: bool,
    pub changed: bool,
    pub text_hits: usize,
    pub link_hits: usize,
    pub renamed: bool,
    pub new_name: Option<String>,
    pub ocr: Option<OcrOutcome>,
    pub staging: Option<StagingOutcome>,
    pub error: Option<FileFailure>,
}

impl FileRecord {
    fn new(candidate: &Candidate, dry_run: bool) -> Self {
        Self {
            path: candidate.path.clone(),
            final_path: candidate.path.clone(),
            cloud: candidate.cloud,
            dry_run,
            changed: false,
            text_hits: 0,
            link_hits: 0,
            renamed: false,
            new_name: None,
            ocr: None,
            staging: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn original_name(&self) -> String {
        file_name(&self.path)
    }

    pub fn total_hits(&self) -> usize {
        self.text_hits + self.link_hits
    }

    fn fail(&mut self, err: ScrubError) {
        log::warn!("[Process] {} 处理失败: {}", self.path.display(), err);
        self.error = Some(FileFailure {
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 强制读取整个文件，让云同步提供方把内容下载到本地
fn hydrate(path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut io::sink())
}

/// OCR 步骤：文本层探测 + 引擎
pub struct OcrStage {
    engine: Box<dyn OcrEngine>,
    probe: Box<dyn TextLayerProbe>,
}

impl OcrStage {
    pub fn new(engine: Box<dyn OcrEngine>, probe: Box<dyn TextLayerProbe>) -> Self {
        Self { engine, probe }
    }

    pub fn engine_version(&self) -> Option<String> {
        self.engine.audit_info().engine_version
    }

    fn run(&mut self, path: &Path, policy: &RetryPolicy) -> OcrOutcome {
        match self.probe.has_searchable_text(path) {
            Ok(true) => return OcrOutcome::NotNeeded,
            Ok(false) => {}
            Err(e) => return OcrOutcome::Failed(format!("text layer probe: {}", e)),
        }

        let stamps = FileStamps::capture(path).ok();
        let output = ocr_temp_path(path);

        let result = self
            .engine
            .ocr_pdf(path, &output)
            .map_err(|e| e.to_string())
            .and_then(|_| {
                policy
                    .run(|_| fs::rename(&output, path))
                    .map_err(|e| e.to_string())
            });

        if let Err(message) = result {
            if output.exists() {
                let _ = fs::remove_file(&output);
            }
            log::warn!("[OCR] {} 失败: {}", path.display(), message);
            return OcrOutcome::Failed(message);
        }

        if let Some(stamps) = stamps {
            if let Err(e) = stamps.restore(path) {
                log::warn!("[OCR] 无法恢复 {} 的时间戳: {}", path.display(), e);
            }
        }
        OcrOutcome::Applied
    }
}

/// 原子替换与最终重命名共用的文件系统操作
type RenameFn = Arc<dyn Fn(&Path, &Path) -> io::Result<()> + Send + Sync>;

/// 文件处理器
pub struct FileProcessor<D: Document> {
    rules: WatermarkRules,
    pattern: WatermarkPattern,
    normalizer: FilenameNormalizer,
    fill: FillColor,
    retry: RetryPolicy,
    renamer: RenameFn,
    options: ProcessOptions,
    ocr: Option<OcrStage>,
    stager: Option<Stager>,
    _document: PhantomData<fn() -> D>,
}

impl<D: Document> FileProcessor<D> {
    pub fn new(rules: WatermarkRules, options: ProcessOptions) -> Result<Self> {
        let pattern = rules.pattern()?;
        let normalizer = FilenameNormalizer::new(&rules);
        Ok(Self {
            rules,
            pattern,
            normalizer,
            fill: FillColor::default(),
            retry: RetryPolicy::default(),
            renamer: Arc::new(|from: &Path, to: &Path| fs::rename(from, to)),
            options,
            ocr: None,
            stager: None,
            _document: PhantomData,
        })
    }

    pub fn with_fill(mut self, fill: FillColor) -> Self {
        self.fill = fill.clamped();
        self
    }

    /// 云同步路径使用的重试策略；本地路径始终只尝试一次
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 替换重命名操作（默认 `fs::rename`）
    pub fn with_renamer<F>(mut self, renamer: F) -> Self
    where
        F: Fn(&Path, &Path) -> io::Result<()> + Send + Sync + 'static,
    {
        self.renamer = Arc::new(renamer);
        self
    }

    pub fn with_ocr(mut self, ocr: OcrStage) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_stager(mut self, stager: Stager) -> Self {
        self.stager = Some(stager);
        self
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    pub fn staging_label(&self) -> Option<&str> {
        self.stager.as_ref().map(|s| s.label())
    }

    pub fn process(&mut self, candidate: &Candidate) -> FileRecord {
        let mut record = FileRecord::new(candidate, self.options.dry_run);
        let policy = if candidate.cloud {
            self.retry.clone()
        } else {
            RetryPolicy::once()
        };

        if let Err(e) = self.clean(candidate, &policy, &mut record) {
            record.fail(e);
            return record;
        }

        if !self.options.no_rename {
            match self.rename(&candidate.path, &policy) {
                Ok(Some(dest)) => {
                    record.renamed = true;
                    record.new_name = Some(file_name(&dest));
                    record.final_path = dest;
                }
                Ok(None) => {}
                Err(e) => {
                    record.fail(e);
                    return record;
                }
            }
        }

        if self.options.dry_run {
            return record;
        }

        if let Some(ocr) = self.ocr.as_mut() {
            record.ocr = Some(ocr.run(&record.final_path, &policy));
        }

        if let Some(stager) = &self.stager {
            let staged_name = self
                .normalizer
                .rename_target(&record.final_path)
                .map(|p| file_name(&p))
                .unwrap_or_else(|| file_name(&record.final_path));
            record.staging = Some(match stager.stage(&record.final_path, &staged_name, &policy) {
                Ok(dest) => StagingOutcome::Copied(dest),
                Err(e) => {
                    log::warn!("[Staging] {} 失败: {}", record.final_path.display(), e);
                    StagingOutcome::Failed(e.to_string())
                }
            });
        }

        record
    }

    /// 扫描并清理内容；有改动时经临时文件原子替换原文件
    fn clean(&self, candidate: &Candidate, policy: &RetryPolicy, record: &mut FileRecord) -> Result<()> {
        let path = &candidate.path;
        let stamps = policy.run(|_| FileStamps::capture(path))?;
        if candidate.cloud {
            policy.run(|_| hydrate(path))?;
        }

        let mut doc = D::load(path)?;

        for index in 0..doc.page_count() {
            record.link_hits += doc.remove_watermark_links(index, &self.rules)?;
        }

        if !self.options.links_only {
            for index in 0..doc.page_count() {
                let matches = match doc.find_watermark(index, &self.pattern) {
                    Ok(matches) => matches,
                    Err(e) => {
                        log::warn!(
                            "[Scan] {} 第 {} 页无法提取文本，按零命中处理: {}",
                            path.display(),
                            index + 1,
                            e
                        );
                        continue;
                    }
                };
                if matches.is_empty() {
                    continue;
                }
                record.text_hits += if self.options.dry_run {
                    matches.len()
                } else {
                    doc.redact(index, &matches, self.fill)?
                };
            }
        }

        record.changed = record.total_hits() > 0;
        if !record.changed || self.options.dry_run {
            return Ok(());
        }

        self.commit(&mut doc, path, policy)?;
        drop(doc);

        if let Err(e) = stamps.restore(path) {
            log::warn!("[Process] 无法恢复 {} 的时间戳: {}", path.display(), e);
        }
        log::info!(
            "[Process] {} 已清理（文字 {}，链接 {}）",
            path.display(),
            record.text_hits,
            record.link_hits
        );
        Ok(())
    }

    /// 保存到临时兄弟文件再替换原文件；失败时删除临时文件，原文件不变
    fn commit(&self, doc: &mut D, path: &Path, policy: &RetryPolicy) -> Result<()> {
        let tmp = temp_path(path);
        let result = doc.save(&tmp).and_then(|_| {
            policy
                .run(|_| (self.renamer)(&tmp, path))
                .map_err(ScrubError::from)
        });

        if result.is_err() && tmp.exists() {
            if let Err(e) = fs::remove_file(&tmp) {
                log::warn!("[Process] 无法删除临时文件 {}: {}", tmp.display(), e);
            }
        }
        result
    }

    fn rename(&self, path: &Path, policy: &RetryPolicy) -> Result<Option<PathBuf>> {
        let target = match self.normalizer.rename_target(path) {
            Some(target) => target,
            None => return Ok(None),
        };
        let dest = unique_path(&target);

        if self.options.dry_run {
            return Ok(Some(dest));
        }

        policy.run(|_| (self.renamer)(path, &dest)).map_err(|e| {
            ScrubError::Rename(format!("{} -> {}: {}", file_name(path), file_name(&dest), e))
        })?;
        log::info!("[Rename] {} -> {}", path.display(), dest.display());
        Ok(Some(dest))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use scrub_core::{Match, Page, Rect};
    use scrub_ocr::{OcrAuditInfo, OcrError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, SystemTime};

    /// 内存文档：文件内容每行描述一页，如 `text=2 links=1 redact_error`
    #[derive(Default)]
    pub(crate) struct FakeDoc {
        pages: Vec<FakePage>,
        save_error: bool,
    }

    #[derive(Default)]
    struct FakePage {
        text: usize,
        links: usize,
        redact_error: bool,
        unreadable: bool,
    }

    impl Document for FakeDoc {
        fn load(path: &Path) -> Result<Self> {
            let raw = fs::read_to_string(path)?;
            if raw.starts_with("corrupt") {
                return Err(ScrubError::Open("trailer not found".to_string()));
            }
            let mut doc = FakeDoc::default();
            for line in raw.lines() {
                if line.trim() == "save_error" {
                    doc.save_error = true;
                    continue;
                }
                let mut page = FakePage::default();
                for token in line.split_whitespace() {
                    match token.split_once('=') {
                        Some(("text", n)) => page.text = n.parse().unwrap(),
                        Some(("links", n)) => page.links = n.parse().unwrap(),
                        _ if token == "redact_error" => page.redact_error = true,
                        _ if token == "unreadable" => page.unreadable = true,
                        _ => {}
                    }
                }
                doc.pages.push(page);
            }
            Ok(doc)
        }

        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page(&self, index: usize) -> Result<Page> {
            Ok(Page {
                index,
                text: String::new(),
            })
        }

        fn find_watermark(&self, index: usize, _pattern: &WatermarkPattern) -> Result<Vec<Match>> {
            let page = &self.pages[index];
            if page.unreadable {
                return Err(ScrubError::Redaction {
                    page: index,
                    reason: "content stream: unexpected EOF".to_string(),
                });
            }
            Ok((0..page.text)
                .map(|_| Match {
                    page: index,
                    text: "OceanofPDFs.com".to_string(),
                    bbox: Rect {
                        x: 0.0,
                        y: 0.0,
                        width: 10.0,
                        height: 10.0,
                    },
                    segments: Vec::new(),
                })
                .collect())
        }

        fn remove_watermark_links(&mut self, index: usize, _rules: &WatermarkRules) -> Result<usize> {
            Ok(std::mem::take(&mut self.pages[index].links))
        }

        fn redact(&mut self, index: usize, matches: &[Match], _fill: FillColor) -> Result<usize> {
            if self.pages[index].redact_error {
                return Err(ScrubError::Redaction {
                    page: index,
                    reason: "malformed page object".to_string(),
                });
            }
            Ok(matches.len())
        }

        fn save(&mut self, path: &Path) -> Result<()> {
            if self.save_error {
                fs::write(path, b"partial")?;
                return Err(ScrubError::Save("disk full".to_string()));
            }
            fs::write(path, b"clean")?;
            Ok(())
        }
    }

    struct FixedProbe(bool);

    impl TextLayerProbe for FixedProbe {
        fn has_searchable_text(&self, _path: &Path) -> Result<bool> {
            Ok(self.0)
        }
    }

    struct FakeOcr {
        fail: bool,
    }

    impl OcrEngine for FakeOcr {
        fn ocr_pdf(&mut self, _input: &Path, output: &Path) -> std::result::Result<(), OcrError> {
            fs::write(output, b"ocr")?;
            if self.fail {
                return Err(OcrError::Failed("tesseract crashed".to_string()));
            }
            Ok(())
        }

        fn audit_info(&self) -> OcrAuditInfo {
            OcrAuditInfo {
                engine: "fake".to_string(),
                engine_version: Some("1.0".to_string()),
                engine_params: None,
            }
        }
    }

    fn past() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
    }

    pub(crate) fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        FileStamps {
            accessed: Some(past()),
            modified: Some(past()),
            created: None,
        }
        .restore(&path)
        .unwrap();
        path
    }

    fn processor(options: ProcessOptions) -> FileProcessor<FakeDoc> {
        FileProcessor::new(WatermarkRules::default(), options)
            .unwrap()
            .with_retry(RetryPolicy::new(3, Duration::ZERO))
    }

    fn local(path: &Path) -> Candidate {
        Candidate {
            path: path.to_path_buf(),
            cloud: false,
        }
    }

    fn cloud(path: &Path) -> Candidate {
        Candidate {
            path: path.to_path_buf(),
            cloud: true,
        }
    }

    /// 只允许覆盖已有文件（原子替换），拒绝改名到新路径
    pub(crate) fn deny_new_names(from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            fs::rename(from, to)
        } else {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
        }
    }

    #[test]
    fn test_clean_and_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "_OceanofPDFs.com_The_Great_Gatsby_-_F._Scott_Fitzgerald.pdf",
            "text=5 links=1\ntext=7 links=2\n",
        );

        let record = processor(ProcessOptions::default()).process(&local(&path));

        assert!(record.is_success());
        assert!(record.changed);
        assert_eq!(record.text_hits, 12);
        assert_eq!(record.link_hits, 3);
        assert!(record.renamed);
        assert_eq!(
            record.new_name.as_deref(),
            Some("F. Scott Fitzgerald - The Great Gatsby.pdf")
        );
        assert!(!path.exists());
        assert_eq!(fs::read(&record.final_path).unwrap(), b"clean");
        assert_eq!(
            FileStamps::capture(&record.final_path).unwrap().modified,
            Some(past())
        );
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_clean_file_only_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let content = "text=0 links=0\n";
        let path = write_fixture(dir.path(), "1984_ (Z-Library).pdf", content);

        let record = processor(ProcessOptions::default()).process(&local(&path));

        assert!(record.is_success());
        assert!(!record.changed);
        assert_eq!(record.total_hits(), 0);
        assert!(record.renamed);
        assert_eq!(record.final_path, dir.path().join("1984.pdf"));
        assert_eq!(fs::read_to_string(&record.final_path).unwrap(), content);
    }

    #[test]
    fn test_redaction_failure_leaves_original() {
        let dir = tempfile::tempdir().unwrap();
        let content = "text=1 links=1 redact_error\n";
        let path = write_fixture(dir.path(), "_OceanofPDF.com_Broken.pdf", content);

        let record = processor(ProcessOptions::default()).process(&local(&path));

        let failure = record.error.clone().unwrap();
        assert_eq!(failure.kind, FailureKind::Redaction);
        assert!(failure.message.contains("malformed page object"));
        assert!(!record.renamed);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert_eq!(FileStamps::capture(&path).unwrap().modified, Some(past()));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_save_failure_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let content = "save_error\ntext=2 links=0\n";
        let path = write_fixture(dir.path(), "Book.pdf", content);

        let record = processor(ProcessOptions::default()).process(&local(&path));

        assert_eq!(record.error.unwrap().kind, FailureKind::Save);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert_eq!(FileStamps::capture(&path).unwrap().modified, Some(past()));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_cloud_timeout_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "Synced.pdf", "text=2 links=0\n");
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let mut processor =
            processor(ProcessOptions::default()).with_renamer(move |_: &Path, _: &Path| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::other("The cloud operation was unsuccessful"))
            });

        let record = processor.process(&cloud(&path));

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(record.changed);
        let failure = record.error.unwrap();
        assert_eq!(failure.kind, FailureKind::TransientIo);
        assert!(failure.message.contains("after 3 attempts"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "text=2 links=0\n");
        assert!(!temp_path(&path).exists());
        assert_eq!(FileStamps::capture(&path).unwrap().modified, Some(past()));

        // 本地文件同样的错误只尝试一次
        attempts.store(0, Ordering::SeqCst);
        let record = processor.process(&local(&path));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(record.error.unwrap().kind, FailureKind::TransientIo);
    }

    #[test]
    fn test_rename_failure_keeps_committed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "_OceanofPDFs.com_1984.pdf", "text=1 links=0\n");

        let record = processor(ProcessOptions::default())
            .with_renamer(deny_new_names)
            .process(&local(&path));

        assert!(record.changed);
        assert!(!record.renamed);
        assert_eq!(record.final_path, path);
        let failure = record.error.unwrap();
        assert_eq!(failure.kind, FailureKind::Rename);
        assert!(failure.message.contains("1984.pdf"));
        assert_eq!(fs::read(&path).unwrap(), b"clean");
        assert!(!dir.path().join("1984.pdf").exists());
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "x.pdf", "corrupt");

        let record = processor(ProcessOptions::default()).process(&local(&path));

        let failure = record.error.unwrap();
        assert_eq!(failure.kind, FailureKind::Open);
        assert!(failure.message.starts_with("open failed"));
    }

    #[test]
    fn test_unreadable_page_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "Book.pdf", "text=4 links=0 unreadable\ntext=1 links=0\n");

        let record = processor(ProcessOptions::default()).process(&local(&path));

        assert!(record.is_success());
        assert_eq!(record.text_hits, 1);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let content = "text=3 links=1\n";
        let path = write_fixture(dir.path(), "_OceanofPDFs.com_Dune_-_Frank_Herbert.pdf", content);

        let record = processor(ProcessOptions {
            dry_run: true,
            ..Default::default()
        })
        .process(&local(&path));

        assert!(record.changed);
        assert_eq!(record.text_hits, 3);
        assert_eq!(record.new_name.as_deref(), Some("Frank Herbert - Dune.pdf"));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert!(!dir.path().join("Frank Herbert - Dune.pdf").exists());
    }

    #[test]
    fn test_links_only_skips_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "Book.pdf", "text=3 links=2\n");

        let record = processor(ProcessOptions {
            links_only: true,
            ..Default::default()
        })
        .process(&local(&path));

        assert_eq!(record.text_hits, 0);
        assert_eq!(record.link_hits, 2);
        assert!(record.changed);
    }

    #[test]
    fn test_rename_avoids_collision() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "Book.pdf", "text=0 links=0\n");
        write_fixture(dir.path(), "Book (1).pdf", "text=0 links=0\n");
        let path = write_fixture(dir.path(), "Book (Z-Library).pdf", "text=0 links=0\n");

        let record = processor(ProcessOptions::default()).process(&local(&path));

        assert_eq!(record.final_path, dir.path().join("Book (2).pdf"));
    }

    #[test]
    fn test_no_rename_option() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "1984_ (Z-Library).pdf", "text=1 links=0\n");

        let record = processor(ProcessOptions {
            no_rename: true,
            ..Default::default()
        })
        .process(&local(&path));

        assert!(record.changed);
        assert!(!record.renamed);
        assert_eq!(record.final_path, path);
    }

    #[test]
    fn test_ocr_applied_and_failure_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "Scan.pdf", "text=0 links=0\n");

        let stage = OcrStage::new(Box::new(FakeOcr { fail: false }), Box::new(FixedProbe(false)));
        assert_eq!(stage.engine_version().as_deref(), Some("1.0"));
        let mut ok = processor(ProcessOptions::default()).with_ocr(stage);
        let record = ok.process(&local(&path));
        assert_eq!(record.ocr, Some(OcrOutcome::Applied));
        assert_eq!(fs::read(&path).unwrap(), b"ocr");
        assert_eq!(FileStamps::capture(&path).unwrap().modified, Some(past()));

        let mut failing = processor(ProcessOptions::default()).with_ocr(OcrStage::new(
            Box::new(FakeOcr { fail: true }),
            Box::new(FixedProbe(false)),
        ));
        let record = failing.process(&local(&path));
        assert!(record.is_success());
        assert!(matches!(record.ocr, Some(OcrOutcome::Failed(_))));
        assert_eq!(fs::read(&path).unwrap(), b"ocr");
        assert!(!ocr_temp_path(&path).exists());

        let mut not_needed = processor(ProcessOptions::default()).with_ocr(OcrStage::new(
            Box::new(FakeOcr { fail: false }),
            Box::new(FixedProbe(true)),
        ));
        assert_eq!(not_needed.process(&local(&path)).ocr, Some(OcrOutcome::NotNeeded));
    }

    #[test]
    fn test_staging_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "1984_ (Z-Library).pdf", "text=0 links=0\n");
        let stager = Stager::new(dir.path().join("staging"), "dystopia").unwrap();

        let mut p = processor(ProcessOptions::default()).with_stager(stager);
        let record = p.process(&local(&path));

        let expected = dir.path().join("staging").join("dystopia").join("1984.pdf");
        assert_eq!(record.staging, Some(StagingOutcome::Copied(expected.clone())));
        assert!(expected.exists());
        assert!(record.final_path.exists());
    }
}
