//! 后台清扫任务
//!
//! 按固定间隔对所有缓存执行 sweep，与请求流量无关；sweep 与 set 争用同一把锁，不会死锁。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cache::MaintainedCache;

/// 启动后台清扫循环，token 取消后退出
pub fn spawn_sweeper(
    caches: Vec<Arc<dyn MaintainedCache>>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            interval_secs = interval.as_secs(),
            caches = caches.len(),
            "Cache sweeper started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval 的第一次 tick 立即完成，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    sweep_all(&caches).await;
                }
            }
        }

        tracing::info!("Cache sweeper stopped");
    })
}

/// 对每个缓存执行一次 sweep，返回总移除数
pub async fn sweep_all(caches: &[Arc<dyn MaintainedCache>]) -> usize {
    let mut total = 0;
    for cache in caches {
        let swept = cache.sweep_expired().await;
        if swept > 0 {
            tracing::info!(cache = cache.cache_name(), swept, "Swept expired cache entries");
        }
        total += swept;
    }
    total
}
