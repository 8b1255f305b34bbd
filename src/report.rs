//! 终端输出与运行汇总

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::processor::{FileRecord, OcrOutcome, StagingOutcome};

/// 每个失败分组最多列出的文件数
const MAX_LISTED_FAILURES: usize = 10;

/// 同类失败（原因相同）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureGroup {
    pub reason: String,
    pub files: Vec<PathBuf>,
}

/// 整次运行的累计结果
#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub cleaned: usize,
    pub renamed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub ocr: usize,
    pub uploaded: usize,
    pub dry_run: bool,
    pub aborted: bool,
    pub journal_path: Option<PathBuf>,
    pub resume_path: Option<PathBuf>,
    failures: Vec<FailureGroup>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn record(&mut self, record: &FileRecord) {
        self.processed += 1;
        if record.changed {
            self.cleaned += 1;
        }
        if record.renamed {
            self.renamed += 1;
        }
        if matches!(record.ocr, Some(OcrOutcome::Applied)) {
            self.ocr += 1;
        }
        if matches!(record.staging, Some(StagingOutcome::Copied(_))) {
            self.uploaded += 1;
        }
        if let Some(failure) = &record.error {
            self.failed += 1;
            self.add_failure(failure_reason(&record.path, &failure.message), &record.path);
        }
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    fn add_failure(&mut self, reason: String, path: &Path) {
        match self.failures.iter_mut().find(|g| g.reason == reason) {
            Some(group) => group.files.push(path.to_path_buf()),
            None => self.failures.push(FailureGroup {
                reason,
                files: vec![path.to_path_buf()],
            }),
        }
    }

    /// 按首次出现顺序
    pub fn failure_groups(&self) -> &[FailureGroup] {
        &self.failures
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}: {} processed | {} cleaned | {} renamed | {} failed",
            if self.dry_run { "DRY RUN" } else { "DONE" },
            self.processed,
            self.cleaned,
            self.renamed,
            self.failed
        )];
        if self.skipped > 0 {
            lines.push(format!("  ↳ {} skipped (already processed)", self.skipped));
        }
        if self.ocr > 0 {
            lines.push(format!("  ↳ {} OCR processed", self.ocr));
        }
        if self.uploaded > 0 {
            lines.push(format!("  ↳ {} uploaded", self.uploaded));
        }
        if self.aborted {
            lines.push("  ↳ scan aborted early; only discovered files were processed".to_string());
        }

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push("Failure summary:".to_string());
            for group in &self.failures {
                lines.push(format!("  [{}] {}", group.files.len(), group.reason));
                for file in group.files.iter().take(MAX_LISTED_FAILURES) {
                    lines.push(format!("    - {}", file.display()));
                }
                if group.files.len() > MAX_LISTED_FAILURES {
                    lines.push(format!(
                        "    ... and {} more",
                        group.files.len() - MAX_LISTED_FAILURES
                    ));
                }
            }
        }

        if let Some(path) = &self.journal_path {
            lines.push(format!("Log: {}", path.display()));
        }
        if let Some(path) = &self.resume_path {
            lines.push(format!("Resume file: {}", path.display()));
        }
        lines
    }
}

/// 分组用的原因：去掉消息中的具体路径和文件名
fn failure_reason(path: &Path, message: &str) -> String {
    let mut reason = message.replace(&path.display().to_string(), "<file>");
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        reason = reason.replace(name, "<file>");
    }
    reason
}

/// 控制台输出：发现阶段的转圈提示、处理阶段的进度条、逐文件结果
pub struct Reporter {
    spinner: Option<ProgressBar>,
    bar: Option<ProgressBar>,
    current_folder: Option<PathBuf>,
    hidden: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            spinner: None,
            bar: None,
            current_folder: None,
            hidden: false,
        }
    }

    /// 不输出任何内容（测试用）
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::new()
        }
    }

    fn println(&self, line: String) {
        if self.hidden {
            return;
        }
        match (&self.bar, &self.spinner) {
            (Some(bar), _) => bar.println(line),
            (None, Some(spinner)) => spinner.println(line),
            (None, None) => println!("{}", line),
        }
    }

    pub fn start_scan(&mut self, abort_hint: bool) {
        if self.hidden {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(if abort_hint {
            "Scanning... (Ctrl-Q to stop scanning)".to_string()
        } else {
            "Scanning...".to_string()
        });
        self.spinner = Some(spinner);
    }

    pub fn scan_progress(&self, dir: &Path, found: usize) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format!("Scanning {} ({} PDFs found)", dir.display(), found));
        }
    }

    pub fn finish_scan(&mut self, total: usize, deferred_cloud: usize, aborted: bool) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        if aborted {
            self.println(format!(
                "{} scan stopped, {} PDFs discovered",
                style("Aborted:").yellow().bold(),
                total
            ));
        } else {
            self.println(format!("Found {} PDFs", style(total).bold()));
        }
        self.deferred_notice(deferred_cloud);
    }

    pub fn line_abort_hint(&self) {
        self.println(style("Type q and press Enter to stop scanning").dim().to_string());
    }

    pub fn deferred_notice(&self, deferred_cloud: usize) {
        if deferred_cloud > 0 {
            self.println(format!(
                "{} cloud-synced PDFs deferred until local files are done",
                style(deferred_cloud).cyan()
            ));
        }
    }

    pub fn start_progress(&mut self, total: usize) {
        if self.hidden {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        self.bar = Some(bar);
    }

    /// 文件所在目录变化时打印目录标题
    pub fn enter_folder(&mut self, folder: Option<&Path>) {
        let folder = match folder {
            Some(folder) => folder,
            None => return,
        };
        if self.current_folder.as_deref() == Some(folder) {
            return;
        }
        self.current_folder = Some(folder.to_path_buf());
        self.println(format!(
            "\n{} {}",
            style("Processing folder:").bold(),
            folder.display()
        ));
    }

    pub fn file_started(&self, path: &Path) {
        if let Some(bar) = &self.bar {
            bar.set_message(display_name(path));
        }
    }

    pub fn skipped(&self, path: &Path) {
        self.println(format!(
            "  {} {}",
            style("Skipped (already processed)").dim(),
            display_name(path)
        ));
        self.tick();
    }

    pub fn file_result(&self, record: &FileRecord) {
        self.println(result_line(record));
        self.tick();
    }

    fn tick(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    pub fn print_summary(&self, summary: &RunSummary) {
        if self.hidden {
            return;
        }
        println!();
        for (i, line) in summary.lines().into_iter().enumerate() {
            if i == 0 {
                println!("{}", style(line).green().bold());
            } else if line == "Failure summary:" {
                println!("{}", style(line).red().bold());
            } else {
                println!("{}", line);
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 单个文件的结果行
fn result_line(record: &FileRecord) -> String {
    let name = record.original_name();
    if let Some(failure) = &record.error {
        return format!("  {} {}: {}", style("Failed").red().bold(), name, failure.message);
    }

    let (clean_verb, rename_verb) = if record.dry_run {
        ("Would clean", "Would rename")
    } else {
        ("Cleaned", "Renamed")
    };
    let new_name = record.new_name.as_deref().unwrap_or_default();

    let mut line = match (record.changed, record.renamed) {
        (true, true) => format!(
            "  {} {} (hits={}) & {} -> {}",
            style(clean_verb).green(),
            name,
            record.total_hits(),
            rename_verb,
            new_name
        ),
        (true, false) => format!(
            "  {} {} (hits={})",
            style(clean_verb).green(),
            name,
            record.total_hits()
        ),
        (false, true) => format!("  {} {} -> {}", style(rename_verb).cyan(), name, new_name),
        (false, false) => format!("  {} {}", style("No changes").dim(), name),
    };

    match &record.ocr {
        Some(OcrOutcome::Applied) => line.push_str(" + OCR"),
        Some(OcrOutcome::Failed(e)) => line.push_str(&format!(" (OCR failed: {})", e)),
        _ => {}
    }
    match &record.staging {
        Some(StagingOutcome::Copied(_)) => line.push_str(" + staged"),
        Some(StagingOutcome::Failed(e)) => line.push_str(&format!(" (staging failed: {})", e)),
        None => {}
    }
    line
}
