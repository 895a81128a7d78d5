//! 优雅关闭处理
//!
//! 提供统一的关闭信号监听和清理逻辑，确保：
//! - HTTP 服务停止接收新请求
//! - 后台清扫任务退出
//! - 两个会话缓存被清空，租约持有的外部资源得到释放
//! - 已投递的驱逐清理任务有机会执行完

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::MaintainedCache;
use crate::core::CleanupQueue;

/// 关闭信号管理器
#[derive(Clone)]
pub struct ShutdownManager {
    /// 关闭信号 token
    shutdown_token: CancellationToken,
}

/// 关闭原因
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    /// 用户发起的退出 (Ctrl+C)
    UserInitiated,
    /// SIGTERM 信号
    Signal,
}

impl ShutdownManager {
    /// 创建新的关闭管理器
    pub fn new() -> Self {
        Self {
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 获取关闭 token（用于取消正在进行的任务）
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// 触发关闭
    pub fn shutdown(&self, reason: ShutdownReason) {
        tracing::info!(?reason, "Shutdown requested");
        self.shutdown_token.cancel();
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 关闭时需要执行的清理任务
#[async_trait::async_trait]
pub trait ShutdownCleanup: Send + Sync {
    /// 执行清理，返回清理是否成功
    async fn cleanup(&self) -> anyhow::Result<()>;

    /// 清理任务名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 关闭协调器：管理多个清理任务
pub struct ShutdownCoordinator {
    cleanup_tasks: Vec<Arc<dyn ShutdownCleanup>>,
    /// 等待清理完成的超时时间（秒）
    timeout_secs: u64,
}

impl ShutdownCoordinator {
    /// 创建新的关闭协调器
    pub fn new() -> Self {
        Self {
            cleanup_tasks: Vec::new(),
            timeout_secs: 5,
        }
    }

    /// 设置清理超时时间
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// 注册清理任务
    pub fn register<T: ShutdownCleanup + 'static>(&mut self, task: T) {
        self.cleanup_tasks.push(Arc::new(task));
    }

    /// 按注册顺序执行清理任务；单个任务失败或超时只记日志
    pub async fn run_cleanup(&self) {
        tracing::info!(tasks = self.cleanup_tasks.len(), "Running shutdown cleanup");
        let timeout = tokio::time::Duration::from_secs(self.timeout_secs);

        for task in &self.cleanup_tasks {
            let task_name = task.name();
            match tokio::time::timeout(timeout, task.cleanup()).await {
                Ok(Ok(())) => tracing::info!(task = task_name, "Shutdown cleanup finished"),
                Ok(Err(e)) => tracing::warn!(task = task_name, error = %e, "Shutdown cleanup failed"),
                Err(_) => tracing::warn!(
                    task = task_name,
                    timeout_secs = self.timeout_secs,
                    "Shutdown cleanup timed out"
                ),
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// 关闭时清空缓存：每个条目都走驱逐清理（释放会话持有的外部资源）
pub struct CacheShutdown {
    cache: Arc<dyn MaintainedCache>,
}

impl CacheShutdown {
    pub fn new(cache: Arc<dyn MaintainedCache>) -> Self {
        Self { cache }
    }
}

#[async_trait::async_trait]
impl ShutdownCleanup for CacheShutdown {
    async fn cleanup(&self) -> anyhow::Result<()> {
        let cleared = self.cache.clear_all().await;
        tracing::info!(cache = self.cache.cache_name(), cleared, "Cache cleared on shutdown");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Cache"
    }
}

/// 等待清理队列中已投递的任务执行完毕（须注册在 CacheShutdown 之后）
pub struct CleanupQueueDrain {
    queue: CleanupQueue,
}

impl CleanupQueueDrain {
    pub fn new(queue: CleanupQueue) -> Self {
        Self { queue }
    }
}

#[async_trait::async_trait]
impl ShutdownCleanup for CleanupQueueDrain {
    async fn cleanup(&self) -> anyhow::Result<()> {
        let pending = self.queue.outstanding();
        if pending > 0 {
            tracing::info!(pending, "Waiting for eviction cleanup jobs");
        }
        self.queue.wait_idle().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "CleanupQueue"
    }
}
