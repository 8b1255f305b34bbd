//! 批处理驱动：发现 → 断点过滤 → 逐个处理 → 记录日志 → 汇总

use serde_json::json;
use std::path::{Path, PathBuf};

use scrub_core::Document;

use crate::abort::{AbortSignal, KeyListener, LineListener};
use crate::discovery::{Candidate, CloudClassifier, Discovery, DiscoveryEvent};
use crate::journal::{EventKind, EventLogEntry, ResumeLog, RESUME_FILE_NAME};
use crate::processor::{FileProcessor, FileRecord, OcrOutcome, StagingOutcome};
use crate::report::{Reporter, RunSummary};

/// 调度方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// 先完整发现再带进度条处理
    Progress,
    /// 本地文件边发现边处理，云同步文件留到最后
    Streaming,
}

pub struct BatchDriver<'a, D: Document> {
    processor: FileProcessor<D>,
    resume: Option<ResumeLog>,
    resume_dir: Option<PathBuf>,
    classifier: &'a dyn CloudClassifier,
    abort: AbortSignal,
    abort_keys: bool,
    reporter: Reporter,
    summary: RunSummary,
}

impl<'a, D: Document> BatchDriver<'a, D> {
    pub fn new(
        processor: FileProcessor<D>,
        classifier: &'a dyn CloudClassifier,
        abort: AbortSignal,
        reporter: Reporter,
    ) -> Self {
        let summary = RunSummary::new(processor.options().dry_run);
        Self {
            processor,
            resume: None,
            resume_dir: None,
            classifier,
            abort,
            abort_keys: false,
            reporter,
            summary,
        }
    }

    pub fn with_resume(mut self, resume: ResumeLog, dir: &Path) -> Self {
        self.resume = Some(resume);
        self.resume_dir = Some(dir.to_path_buf());
        self
    }

    /// 扫描期间监听中止输入（进度模式 Ctrl-Q，流式模式 `q` 回车）
    pub fn with_abort_keys(mut self, enabled: bool) -> Self {
        self.abort_keys = enabled;
        self
    }

    pub fn run(mut self, roots: &[PathBuf], mode: DispatchMode) -> RunSummary {
        match mode {
            DispatchMode::Progress => self.run_progress(roots),
            DispatchMode::Streaming => self.run_streaming(roots),
        }
        self.reporter.finish();

        if let Some(resume) = &self.resume {
            self.summary.journal_path = Some(resume.journal_path().to_path_buf());
        }
        self.summary.resume_path = self.resume_dir.as_ref().map(|d| d.join(RESUME_FILE_NAME));
        self.reporter.print_summary(&self.summary);
        self.summary
    }

    fn run_progress(&mut self, roots: &[PathBuf]) {
        let discovery = Discovery::new(self.classifier, self.abort.clone());

        let discovered = {
            let listener = if self.abort_keys {
                KeyListener::spawn(self.abort.clone())
            } else {
                None
            };
            self.reporter.start_scan(listener.is_some());
            let reporter = &self.reporter;
            discovery.collect(roots, |dir, found| reporter.scan_progress(dir, found))
        };

        self.summary.aborted = discovered.aborted;
        self.reporter
            .finish_scan(discovered.total(), discovered.cloud.len(), discovered.aborted);
        self.reporter.start_progress(discovered.total());

        for candidate in discovered.into_ordered() {
            self.dispatch(&candidate);
        }
    }

    /// 终端保持普通模式，中止命令按行读取
    fn run_streaming(&mut self, roots: &[PathBuf]) {
        let discovery = Discovery::new(self.classifier, self.abort.clone());
        let mut deferred: Vec<Candidate> = Vec::new();

        if self.abort_keys && LineListener::spawn(self.abort.clone()).is_some() {
            self.reporter.line_abort_hint();
        }

        let aborted = discovery.walk(roots, |event| {
            if let DiscoveryEvent::File(candidate) = event {
                if candidate.cloud {
                    deferred.push(candidate);
                } else {
                    self.dispatch(&candidate);
                }
            }
        });
        self.summary.aborted = aborted;

        self.reporter.deferred_notice(deferred.len());
        for candidate in &deferred {
            self.dispatch(candidate);
        }
    }

    fn dispatch(&mut self, candidate: &Candidate) {
        self.reporter.enter_folder(candidate.path.parent());

        if let Some(resume) = self.resume.as_mut() {
            if resume.is_processed(&candidate.path) {
                if !self.summary.dry_run {
                    resume.record(EventLogEntry::new(
                        EventKind::Skipped,
                        &candidate.path,
                        json!({ "reason": "already_processed" }),
                    ));
                }
                self.summary.record_skipped();
                self.reporter.skipped(&candidate.path);
                return;
            }
        }

        self.reporter.file_started(&candidate.path);
        let record = self.processor.process(candidate);
        self.summary.record(&record);
        self.reporter.file_result(&record);
        self.journal(&record);
    }

    /// 写入事件；成功且非演练时标记为已处理（以最终路径为准）
    fn journal(&mut self, record: &FileRecord) {
        if record.dry_run {
            return;
        }
        let label = self.processor.staging_label().map(str::to_string);
        let resume = match self.resume.as_mut() {
            Some(resume) => resume,
            None => return,
        };
        for entry in journal_entries(record, label.as_deref()) {
            resume.record(entry);
        }
        if record.is_success() {
            resume.mark_processed(&record.final_path);
        }
    }
}

/// 单个文件结果对应的事件
fn journal_entries(record: &FileRecord, label: Option<&str>) -> Vec<EventLogEntry> {
    if let Some(failure) = &record.error {
        return vec![EventLogEntry::new(
            EventKind::Failed,
            &record.path,
            json!({ "error": failure.message, "stage": failure.kind }),
        )];
    }

    let mut entries = Vec::new();
    let original_name = record.original_name();

    if record.changed {
        entries.push(EventLogEntry::new(
            EventKind::Cleaned,
            &record.final_path,
            json!({
                "original_name": original_name,
                "text_hits": record.text_hits,
                "link_hits": record.link_hits,
                "renamed": record.renamed,
                "new_name": record.new_name,
            }),
        ));
    } else if record.renamed {
        entries.push(EventLogEntry::new(
            EventKind::Renamed,
            &record.final_path,
            json!({ "original_name": original_name, "new_name": record.new_name }),
        ));
    }

    match &record.ocr {
        Some(OcrOutcome::Applied) => entries.push(EventLogEntry::new(
            EventKind::Ocr,
            &record.final_path,
            json!({ "success": true, "applied": true }),
        )),
        Some(OcrOutcome::Failed(error)) => entries.push(EventLogEntry::new(
            EventKind::Ocr,
            &record.final_path,
            json!({ "success": false, "applied": false, "error": error }),
        )),
        Some(OcrOutcome::NotNeeded) | None => {}
    }

    if let Some(staging) = &record.staging {
        let details = match staging {
            StagingOutcome::Copied(dest) => json!({
                "label": label,
                "success": true,
                "destination": dest.to_string_lossy(),
            }),
            StagingOutcome::Failed(error) => json!({
                "label": label,
                "success": false,
                "error": error,
            }),
        };
        entries.push(EventLogEntry::new(EventKind::Uploaded, &record.final_path, details));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessOptions;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use scrub_core::WatermarkRules;
    use scrub_pdf::PdfDocument;
    use std::fs;

    /// 路径中含 "cloud" 即视为云同步
    struct NameClassifier;

    impl CloudClassifier for NameClassifier {
        fn is_cloud(&self, path: &Path) -> bool {
            path.to_string_lossy().contains("cloud")
        }
    }

    /// 每个元素为一页：(文字行, 链接 URI)
    fn build_pdf(path: &Path, pages: &[(Vec<&str>, Vec<&str>)]) {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for (lines, links) in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![72.into(), 780.into()]),
            ];
            for line in lines {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
            }
            operations.push(Operation::new("ET", vec![]));
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            let annots: Vec<Object> = links
                .iter()
                .map(|uri| {
                    Object::Reference(doc.add_object(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Link",
                        "Rect" => vec![72.into(), 40.into(), 200.into(), 60.into()],
                        "A" => dictionary! { "S" => "URI", "URI" => Object::string_literal(*uri) },
                    }))
                })
                .collect();
            if !annots.is_empty() {
                page.set("Annots", annots);
            }
            kids.push(doc.add_object(page).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    /// 三页，每页四处带空格的水印，共三个水印链接
    fn gatsby(path: &Path) {
        let page = |links: Vec<&'static str>| {
            (
                vec![
                    "In my younger and more vulnerable years",
                    "O c e a n o f P D F s . c o m",
                    "my father gave me some advice",
                    "O c e a n o f P D F s . c o m",
                    "O c e a n o f P D F s . c o m",
                    "that I have been turning over in my mind",
                    "O c e a n o f P D F s . c o m",
                ],
                links,
            )
        };
        build_pdf(
            path,
            &[
                page(vec!["https://OceanofPDFs.com/"]),
                page(vec!["https://oceanofpdfs.com/books", "https://example.org/"]),
                page(vec!["http://www.oceanofpdf.com"]),
            ],
        );
    }

    fn fixture_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("library");
        fs::create_dir_all(&library).unwrap();
        gatsby(&library.join("_OceanofPDFs.com_The_Great_Gatsby_-_F._Scott_Fitzgerald.pdf"));
        build_pdf(
            &library.join("1984_ (Z-Library).pdf"),
            &[(vec!["It was a bright cold day in April"], vec![])],
        );
        dir
    }

    fn processor(options: ProcessOptions) -> FileProcessor<PdfDocument> {
        FileProcessor::new(WatermarkRules::default(), options).unwrap()
    }

    fn run(
        root: &Path,
        log_dir: Option<&Path>,
        options: ProcessOptions,
        mode: DispatchMode,
    ) -> RunSummary {
        run_with(processor(options), root, log_dir, mode)
    }

    fn run_with(
        processor: FileProcessor<PdfDocument>,
        root: &Path,
        log_dir: Option<&Path>,
        mode: DispatchMode,
    ) -> RunSummary {
        let classifier = NameClassifier;
        let mut driver = BatchDriver::new(
            processor,
            &classifier,
            AbortSignal::new(),
            Reporter::hidden(),
        );
        if let Some(dir) = log_dir {
            driver = driver.with_resume(ResumeLog::open(dir).unwrap(), dir);
        }
        driver.run(&[root.to_path_buf()], mode)
    }

    fn journal_lines(log_dir: &Path) -> Vec<serde_json::Value> {
        let mut lines = Vec::new();
        for entry in fs::read_dir(log_dir).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                let raw = fs::read_to_string(&path).unwrap();
                lines.extend(raw.lines().map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()));
            }
        }
        lines
    }

    #[test]
    fn test_clean_and_rename_library() {
        let dir = fixture_tree();
        let library = dir.path().join("library");
        let log_dir = dir.path().join("logs");

        let summary = run(&library, Some(&log_dir), ProcessOptions::default(), DispatchMode::Progress);

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.cleaned, 1);
        assert_eq!(summary.renamed, 2);
        assert_eq!(summary.failed, 0);

        let gatsby = library.join("F. Scott Fitzgerald - The Great Gatsby.pdf");
        assert!(gatsby.exists());
        assert!(library.join("1984.pdf").exists());
        assert!(!library
            .join("_OceanofPDFs.com_The_Great_Gatsby_-_F._Scott_Fitzgerald.pdf")
            .exists());

        let mut doc = PdfDocument::load(&gatsby).unwrap();
        let pattern = WatermarkRules::default().pattern().unwrap();
        for index in 0..doc.page_count() {
            assert!(doc.find_watermark(index, &pattern).unwrap().is_empty());
            assert_eq!(doc.remove_watermark_links(index, &WatermarkRules::default()).unwrap(), 0);
        }

        let events = journal_lines(&log_dir);
        let cleaned = events.iter().find(|e| e["event"] == "cleaned").unwrap();
        assert_eq!(cleaned["details"]["text_hits"], 12);
        assert_eq!(cleaned["details"]["link_hits"], 3);
        assert_eq!(cleaned["details"]["renamed"], true);
        assert_eq!(
            cleaned["details"]["new_name"],
            "F. Scott Fitzgerald - The Great Gatsby.pdf"
        );
        let renamed = events.iter().find(|e| e["event"] == "renamed").unwrap();
        assert_eq!(renamed["details"]["original_name"], "1984_ (Z-Library).pdf");
        assert_eq!(renamed["details"]["new_name"], "1984.pdf");
    }

    #[test]
    fn test_second_run_skips_everything() {
        let dir = fixture_tree();
        let library = dir.path().join("library");
        let log_dir = dir.path().join("logs");

        run(&library, Some(&log_dir), ProcessOptions::default(), DispatchMode::Progress);
        let second = run(&library, Some(&log_dir), ProcessOptions::default(), DispatchMode::Streaming);

        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 2);
        assert!(second.lines()[1].contains("2 skipped (already processed)"));
        assert_eq!(second.resume_path, Some(log_dir.join(RESUME_FILE_NAME)));

        let skipped: Vec<_> = journal_lines(&log_dir)
            .into_iter()
            .filter(|e| e["event"] == "skipped")
            .collect();
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0]["details"]["reason"], "already_processed");
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let dir = fixture_tree();
        let library = dir.path().join("library");
        let log_dir = dir.path().join("logs");
        let before = fs::read(library.join("1984_ (Z-Library).pdf")).unwrap();

        let options = ProcessOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = run(&library, Some(&log_dir), options, DispatchMode::Progress);

        assert!(summary.dry_run);
        assert_eq!(summary.cleaned, 1);
        assert_eq!(summary.renamed, 2);
        assert_eq!(fs::read(library.join("1984_ (Z-Library).pdf")).unwrap(), before);
        assert!(!library.join("1984.pdf").exists());
        assert!(!log_dir.join(RESUME_FILE_NAME).exists());

        let again = run(&library, Some(&log_dir), ProcessOptions::default(), DispatchMode::Progress);
        assert_eq!(again.skipped, 0);
        assert_eq!(again.processed, 2);
    }

    #[test]
    fn test_broken_file_recorded_as_failure() {
        let dir = fixture_tree();
        let library = dir.path().join("library");
        let log_dir = dir.path().join("logs");
        fs::write(library.join("broken.pdf"), b"%PDF-1.5 truncated").unwrap();

        let summary = run(&library, Some(&log_dir), ProcessOptions::default(), DispatchMode::Streaming);

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failure_groups().len(), 1);
        assert!(summary.failure_groups()[0].reason.starts_with("open failed"));

        let events = journal_lines(&log_dir);
        let failed = events.iter().find(|e| e["event"] == "failed").unwrap();
        assert_eq!(failed["details"]["stage"], "open");

        // 失败的文件不计入已处理集合，下次重试
        let again = run(&library, Some(&log_dir), ProcessOptions::default(), DispatchMode::Progress);
        assert_eq!(again.skipped, 2);
        assert_eq!(again.failed, 1);
    }

    #[test]
    fn test_rename_failure_not_marked_processed() {
        let dir = fixture_tree();
        let library = dir.path().join("library");
        let log_dir = dir.path().join("logs");
        let gatsby = library.join("_OceanofPDFs.com_The_Great_Gatsby_-_F._Scott_Fitzgerald.pdf");

        let blocked = processor(ProcessOptions::default())
            .with_renamer(crate::processor::tests::deny_new_names);
        let summary = run_with(blocked, &library, Some(&log_dir), DispatchMode::Progress);

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 2);
        let events = journal_lines(&log_dir);
        let failed: Vec<_> = events.iter().filter(|e| e["event"] == "failed").collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|e| e["details"]["stage"] == "rename"));

        let resume = ResumeLog::open(&log_dir).unwrap();
        assert_eq!(resume.processed_count(), 0);
        assert!(!resume.is_processed(&gatsby));

        // 已提交的清理保留，重跑时只剩重命名
        let mut doc = PdfDocument::load(&gatsby).unwrap();
        assert_eq!(doc.remove_watermark_links(0, &WatermarkRules::default()).unwrap(), 0);

        let again = run(&library, Some(&log_dir), ProcessOptions::default(), DispatchMode::Progress);
        assert_eq!(again.skipped, 0);
        assert_eq!(again.failed, 0);
        assert_eq!(again.cleaned, 0);
        assert_eq!(again.renamed, 2);
        assert!(library.join("F. Scott Fitzgerald - The Great Gatsby.pdf").exists());
    }

    #[test]
    fn test_cloud_files_processed_last() {
        let dir = tempfile::tempdir().unwrap();
        let cloud = dir.path().join("a_cloud");
        let local = dir.path().join("b_local");
        fs::create_dir_all(&cloud).unwrap();
        fs::create_dir_all(&local).unwrap();
        build_pdf(&cloud.join("Remote (Z-Library).pdf"), &[(vec!["text"], vec![])]);
        build_pdf(&local.join("Local (Z-Library).pdf"), &[(vec!["text"], vec![])]);
        let log_dir = dir.path().join("logs");

        run(dir.path(), Some(&log_dir), ProcessOptions::default(), DispatchMode::Streaming);

        let renamed: Vec<String> = journal_lines(&log_dir)
            .into_iter()
            .filter(|e| e["event"] == "renamed")
            .map(|e| e["details"]["new_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(renamed, vec!["Local.pdf".to_string(), "Remote.pdf".to_string()]);
    }

    #[test]
    fn test_journal_entries_for_ocr_and_staging() {
        let mut record = FileRecord {
            path: PathBuf::from("/lib/a.pdf"),
            final_path: PathBuf::from("/lib/a.pdf"),
            cloud: false,
            dry_run: false,
            changed: false,
            text_hits: 0,
            link_hits: 0,
            renamed: false,
            new_name: None,
            ocr: Some(OcrOutcome::Applied),
            staging: Some(StagingOutcome::Failed("disk full".to_string())),
            error: None,
        };
        let entries = journal_entries(&record, Some("classics"));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, EventKind::Ocr);
        assert_eq!(entries[0].details["success"], true);
        assert_eq!(entries[1].event, EventKind::Uploaded);
        assert_eq!(entries[1].details["label"], "classics");
        assert_eq!(entries[1].details["success"], false);

        record.ocr = Some(OcrOutcome::NotNeeded);
        record.staging = None;
        assert!(journal_entries(&record, None).is_empty());
    }
}
