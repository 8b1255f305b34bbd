use anyhow::{bail, Context};
use clap::Parser;
use console::style;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use pdf_scrub::{
    config_path, load_config, save_config, AbortSignal, AppConfig, BatchDriver, DispatchMode,
    FileProcessor, OcrStage, PatternCloudClassifier, ProcessOptions, Reporter, ResumeLog, Stager,
};
use scrub_ocr::{detect_ocrmypdf_status, OcrMyPdfEngine};
use scrub_pdf::PdfDocument;

/// 批量清除 PDF 中的水印文字与链接，并规范化文件名
#[derive(Parser, Debug)]
#[command(name = "pdf-scrub", version, about)]
struct Cli {
    /// PDF 文件或目录（递归扫描）
    #[arg(required_unless_present_any = ["print_config", "save_config"])]
    paths: Vec<PathBuf>,

    /// 只报告，不修改任何文件
    #[arg(long)]
    dry_run: bool,

    /// 只删除水印链接，不处理页面文字
    #[arg(long)]
    links_only: bool,

    /// 不重命名文件
    #[arg(long)]
    no_rename: bool,

    /// 不显示进度条，边发现边处理（输入 q 回车停止扫描）
    #[arg(long)]
    no_progress: bool,

    /// 日志目录：记录事件并跳过已处理的文件
    #[arg(long, value_name = "DIR")]
    log: Option<PathBuf>,

    /// 为没有文本层的 PDF 运行 ocrmypdf
    #[arg(long, alias = "ocrmypdf")]
    ocr: bool,

    /// 把处理后的文件复制到暂存目录下的该标签分组
    #[arg(long, value_name = "LABEL")]
    notebooklm: Option<String>,

    /// 暂存根目录（覆盖配置文件）
    #[arg(long, value_name = "DIR")]
    staging_root: Option<PathBuf>,

    /// 配置文件
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 把当前生效的配置写入默认位置
    #[arg(long)]
    save_config: bool,

    /// 打印当前生效的配置并退出
    #[arg(long)]
    print_config: bool,

    /// 日志详细程度（-v info，-vv debug）
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("logger init failed: {}", e);
    }
}

fn effective_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(root) = &cli.staging_root {
        config.staging_root = Some(root.clone());
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = effective_config(&cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }
    if cli.save_config {
        let path = config_path()?;
        save_config(&path, &config)?;
        println!("Saved configuration to {}", path.display());
        if cli.paths.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let mut roots = Vec::new();
    for path in &cli.paths {
        if path.exists() {
            roots.push(path.clone());
        } else {
            eprintln!("{} path not found: {}", style("Warning:").yellow(), path.display());
        }
    }
    if roots.is_empty() {
        eprintln!("{} no valid paths to process", style("Error:").red().bold());
        return Ok(ExitCode::FAILURE);
    }

    let options = ProcessOptions {
        dry_run: cli.dry_run,
        links_only: cli.links_only,
        no_rename: cli.no_rename,
    };
    let mut processor = FileProcessor::<PdfDocument>::new(config.watermark.clone(), options)?
        .with_fill(config.redaction.fill)
        .with_retry(config.retry.policy());

    if cli.ocr && !cli.dry_run {
        let status = detect_ocrmypdf_status(&config.ocr);
        log::debug!("[OCR] 安装状态: {:?}", status);
        match OcrMyPdfEngine::from_status(config.ocr.clone(), &status) {
            Ok(engine) => {
                let stage = OcrStage::new(Box::new(engine), Box::new(config.text_probe.probe()));
                log::info!(
                    "[OCR] 使用 ocrmypdf {}",
                    stage.engine_version().as_deref().unwrap_or("(unknown version)")
                );
                processor = processor.with_ocr(stage);
            }
            Err(_) => eprintln!(
                "{} OCR disabled: {}",
                style("Warning:").yellow(),
                status.describe()
            ),
        }
    }

    if let Some(label) = &cli.notebooklm {
        if !cli.dry_run {
            let root = config
                .staging_root()
                .context("no staging root configured and home directory unknown")?;
            processor = processor.with_stager(Stager::new(root, label)?);
        }
    }

    let classifier = PatternCloudClassifier::new(&config.cloud_patterns);
    let mode = if cli.no_progress {
        DispatchMode::Streaming
    } else {
        DispatchMode::Progress
    };

    let mut driver = BatchDriver::new(processor, &classifier, AbortSignal::new(), Reporter::new())
        .with_abort_keys(std::io::stdin().is_terminal());
    if let Some(dir) = &cli.log {
        let resume = ResumeLog::open(dir)
            .with_context(|| format!("failed to open log directory {}", dir.display()))?;
        if resume.processed_count() > 0 {
            println!("Resuming: {} files already processed", resume.processed_count());
        }
        driver = driver.with_resume(resume, dir);
    }

    if cli.dry_run {
        println!("{}", style("DRY RUN: no files will be modified").yellow().bold());
    }

    let summary = driver.run(&roots, mode);
    log::debug!("[Main] 完成: {:?}", summary);
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
