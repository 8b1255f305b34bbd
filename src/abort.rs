//! 扫描中止信号
//!
//! 后台线程监听 Ctrl-Q（扫描期间终端处于 raw 模式，Ctrl-C 也作为按键到达），
//! 触发后只停止文件发现，已发现的文件照常处理。
//!
//! 流式模式下输出与扫描交错，终端保持普通模式，改为按行读取：输入 `q` 回车。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{BufRead, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 协作式取消标记，只在发现阶段轮询
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 按键监听线程，drop 时停止并恢复终端
pub struct KeyListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyListener {
    /// 标准输入不是终端时返回 `None`
    pub fn spawn(signal: AbortSignal) -> Option<Self> {
        if !std::io::stdin().is_terminal() {
            return None;
        }
        if let Err(e) = terminal::enable_raw_mode() {
            log::debug!("[Abort] 无法进入 raw 模式: {}", e);
            return None;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key)) = event::read() {
                            if is_abort_key(&key) {
                                log::info!("[Abort] 收到中止按键，停止扫描");
                                signal.raise();
                                break;
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        log::debug!("[Abort] 读取按键失败: {}", e);
                        break;
                    }
                }
            }
        });

        Some(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let _ = terminal::disable_raw_mode();
    }
}

/// 按行监听中止命令，不切换终端模式
///
/// 读取线程阻塞在标准输入上，无法主动结束，因此不等待它退出。
pub struct LineListener;

impl LineListener {
    /// 标准输入不是终端时返回 `None`
    pub fn spawn(signal: AbortSignal) -> Option<Self> {
        if !std::io::stdin().is_terminal() {
            return None;
        }
        let spawned = thread::Builder::new()
            .name("abort-line".to_string())
            .spawn(move || watch_lines(std::io::stdin().lock(), &signal));
        match spawned {
            Ok(_) => Some(Self),
            Err(e) => {
                log::debug!("[Abort] 无法启动输入线程: {}", e);
                None
            }
        }
    }
}

/// 读到 `q` 或 `quit` 时触发中止；输入结束或出错时返回
fn watch_lines<R: BufRead>(reader: R, signal: &AbortSignal) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if matches!(line.trim().to_ascii_lowercase().as_str(), "q" | "quit") {
            log::info!("[Abort] 收到中止命令，停止扫描");
            signal.raise();
            break;
        }
    }
}

fn is_abort_key(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
}
