//! 智能体租约缓存：会话 ID -> AgentRuntime
//!
//! 同一会话的后续回合复用同一个运行时（对话记忆、已创建的智能体）。
//! 驱逐时 RuntimeTeardownHook 并发释放全部子资源（对话记忆 + 每个智能体），汇总结果后再 teardown；
//! 任一子资源失败不影响其它。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{join_all, BoxFuture};

use super::AgentRuntime;
use crate::cache::{Cleanable, EvictionHook, TtlLruCache};
use crate::core::{AgentError, CleanupQueue};
use crate::tools::TurnContext;

/// 驱逐回调：释放子资源，然后关闭运行时
pub struct RuntimeTeardownHook;

#[async_trait]
impl EvictionHook<Arc<AgentRuntime>> for RuntimeTeardownHook {
    async fn on_evict(&self, runtime: &Arc<AgentRuntime>) -> anyhow::Result<()> {
        let agents = runtime.agents().await;
        let mut releases: Vec<BoxFuture<'_, anyhow::Result<()>>> = vec![runtime.memory().cleanup()];
        releases.extend(agents.iter().map(|agent| agent.release()));
        let total = releases.len();
        let outcomes = join_all(releases).await;

        let mut failed = 0usize;
        for err in outcomes.into_iter().filter_map(Result::err) {
            failed += 1;
            tracing::warn!(session_id = runtime.session_id(), error = %err, "Sub-resource cleanup failed");
        }

        runtime.teardown().await;
        tracing::info!(
            session_id = runtime.session_id(),
            released = total - failed,
            failed,
            "Agent runtime evicted"
        );
        Ok(())
    }
}

pub struct AgentLeaseCache {
    cache: Arc<TtlLruCache<Arc<AgentRuntime>>>,
    memory_turns: usize,
}

impl AgentLeaseCache {
    pub fn new(max_size: usize, ttl: Duration, cleanup: CleanupQueue, memory_turns: usize) -> Self {
        let cache = TtlLruCache::new("agent_leases", max_size, ttl, cleanup)
            .with_hook(Arc::new(RuntimeTeardownHook));
        Self {
            cache: Arc::new(cache),
            memory_turns,
        }
    }

    pub fn cache(&self) -> Arc<TtlLruCache<Arc<AgentRuntime>>> {
        Arc::clone(&self.cache)
    }

    /// 命中则刷新 TTL 并返回已有运行时；否则用 factory 构造、存入并返回。同一 key 幂等。
    pub async fn lease_with<F>(&self, session_id: &str, factory: F) -> Result<(Arc<AgentRuntime>, bool), AgentError>
    where
        F: FnOnce() -> Result<AgentRuntime, AgentError>,
    {
        if session_id.trim().is_empty() {
            return Err(AgentError::EmptySessionKey);
        }
        self.cache
            .get_or_try_insert_with(session_id, || factory().map(Arc::new))
            .await
    }

    /// 为本回合租用运行时；命中时用请求元数据刷新运行时上下文
    pub async fn lease_for(&self, ctx: &TurnContext) -> Result<Arc<AgentRuntime>, AgentError> {
        let memory_turns = self.memory_turns;
        let (runtime, created) = self
            .lease_with(&ctx.session_id, || {
                Ok(AgentRuntime::new(
                    ctx.session_id.clone(),
                    ctx.metadata.clone(),
                    memory_turns,
                ))
            })
            .await?;

        if created {
            tracing::info!(session_id = %ctx.session_id, "Created new agent runtime");
        } else {
            runtime.refresh_metadata(&ctx.metadata).await;
        }
        Ok(runtime)
    }

    /// 丢弃已关闭的运行时；缓存里已是另一个运行时则不动
    pub async fn discard(&self, runtime: &Arc<AgentRuntime>) -> bool {
        self.cache
            .delete_if(runtime.session_id(), |current| Arc::ptr_eq(current, runtime))
            .await
    }

    /// 显式让某个会话的租约过期（走完整的驱逐清理）
    pub async fn expire(&self, session_id: &str) -> bool {
        let removed = self.cache.delete(session_id).await;
        if removed {
            tracing::info!(session_id, "Agent runtime expired on request");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }
}
