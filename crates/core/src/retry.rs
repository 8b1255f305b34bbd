//! 有界重试策略
//!
//! 云同步目录中的文件操作经常出现超时类错误，按固定间隔重试有限次数。

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

type TransientPredicate = Arc<dyn Fn(&io::Error) -> bool + Send + Sync>;

/// 重试策略：最大尝试次数、退避间隔、暂时性错误判定
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    is_transient: TransientPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            is_transient: Arc::new(is_cloud_timeout),
        }
    }

    /// 只尝试一次（本地文件）
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&io::Error) -> bool + Send + Sync + 'static,
    {
        self.is_transient = Arc::new(predicate);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn is_transient(&self, err: &io::Error) -> bool {
        (self.is_transient)(err)
    }

    /// 执行操作，暂时性错误按策略重试
    ///
    /// 返回值中的 `u32` 为实际尝试次数；非暂时性错误立即返回。
    pub fn run<T, F>(&self, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> io::Result<T>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if self.is_transient(&err) => {
                    if attempt >= self.max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    log::warn!(
                        "[Retry] 第 {}/{} 次尝试失败: {}，{:?} 后重试",
                        attempt,
                        self.max_attempts,
                        err,
                        self.backoff
                    );
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(RetryError::Permanent(err)),
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Permanent(io::Error),
}

impl From<RetryError> for crate::ScrubError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } => {
                crate::ScrubError::TransientIo { attempts, source }
            }
            RetryError::Permanent(source) => crate::ScrubError::Io(source),
        }
    }
}

/// 默认判定：超时类错误或云同步提供方报出的操作失败
pub fn is_cloud_timeout(err: &io::Error) -> bool {
    if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    ["cloud operation", "time-out", "timed out", "timeout"]
        .iter()
        .any(|sig| message.contains(sig))
}
