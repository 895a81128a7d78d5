//! 驱逐清理队列
//!
//! 缓存驱逐只负责把清理任务投递到有界队列；后台 worker 取出任务，在 Semaphore 限制下并发执行。
//! get / set / delete 在投递完成后立即返回，不等待外部资源释放。

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{mpsc, Notify, Semaphore};

/// 一个待执行的清理任务
pub type CleanupJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// 有界清理队列（可 Clone，多个缓存共享同一组 worker）
#[derive(Clone)]
pub struct CleanupQueue {
    tx: mpsc::Sender<CleanupJob>,
    /// 已投递但尚未执行完的任务数
    outstanding: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl CleanupQueue {
    /// 创建队列并启动后台 worker；必须在 Tokio 运行时内调用
    pub fn spawn(capacity: usize, concurrency: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let outstanding = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        tokio::spawn(run_worker(
            rx,
            concurrency.max(1),
            Arc::clone(&outstanding),
            Arc::clone(&idle),
        ));

        Self {
            tx,
            outstanding,
            idle,
        }
    }

    /// 投递清理任务；队列满时等待空位（背压），但不等待任务执行
    pub async fn submit(&self, job: CleanupJob) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).await.is_err() {
            tracing::warn!("Cleanup queue closed, dropping cleanup job");
            self.finish_one();
        }
    }

    /// 当前未完成的清理任务数
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// 等待所有已投递的清理任务执行完毕（关闭流程与测试使用）
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish_one(&self) {
        release(&self.outstanding, &self.idle);
    }
}

fn release(outstanding: &AtomicUsize, idle: &Notify) {
    if outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
        idle.notify_waiters();
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<CleanupJob>,
    concurrency: usize,
    outstanding: Arc<AtomicUsize>,
    idle: Arc<Notify>,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));

    while let Some(job) = rx.recv().await {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let outstanding = Arc::clone(&outstanding);
        let idle = Arc::clone(&idle);

        tokio::spawn(async move {
            if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                tracing::error!("Cleanup job panicked");
            }
            drop(permit);
            release(&outstanding, &idle);
        });
    }

    tracing::debug!("Cleanup worker stopped");
}
