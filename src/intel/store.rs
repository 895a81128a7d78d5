//! 会话情报存储
//!
//! 建立在 TtlLruCache 之上：每个会话一条 SessionIntel。合并在缓存锁内完成「读取 + 合并 + 回写」，
//! 同一会话的并发回合因此看到一致的最新结果。

use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlLruCache;
use crate::core::{AgentError, CleanupQueue};
use crate::intel::{IntelUpdate, SessionIntel};

/// 会话 ID -> 累积情报
pub struct IntelStore {
    cache: Arc<TtlLruCache<SessionIntel>>,
}

impl IntelStore {
    pub fn new(max_size: usize, ttl: Duration, cleanup: CleanupQueue) -> Self {
        Self {
            cache: Arc::new(TtlLruCache::new("session_intel", max_size, ttl, cleanup)),
        }
    }

    /// 底层缓存（供后台清扫与关闭流程使用）
    pub fn cache(&self) -> Arc<TtlLruCache<SessionIntel>> {
        Arc::clone(&self.cache)
    }

    /// 返回已有记录，或创建一条空记录并存入
    pub async fn get_or_init(&self, session_id: &str) -> Result<SessionIntel, AgentError> {
        let key = session_key(session_id)?;
        Ok(self
            .cache
            .upsert_with(key, SessionIntel::default, |intel| intel.clone())
            .await)
    }

    /// 合并部分情报并返回合并后的记录，调用方可立即交给 CallbackGate 判断
    pub async fn merge(&self, session_id: &str, update: IntelUpdate) -> Result<SessionIntel, AgentError> {
        let key = session_key(session_id)?;
        let merged = self
            .cache
            .upsert_with(key, SessionIntel::default, move |intel| {
                intel.merge(update);
                intel.clone()
            })
            .await;

        tracing::debug!(
            session_id = key,
            scam_detected = merged.scam_detected,
            message_count = merged.message_count,
            "Session intel merged"
        );
        Ok(merged)
    }

    /// 只读查看（刷新 TTL，但不创建记录）
    pub async fn peek(&self, session_id: &str) -> Option<SessionIntel> {
        self.cache.get(session_id).await
    }

    /// 标记上报成功；记录已被驱逐时返回 false
    pub async fn mark_reported(&self, session_id: &str) -> bool {
        self.cache
            .update_existing(session_id, SessionIntel::record_report)
            .await
            .is_some()
    }

    /// 显式丢弃某个会话的情报
    pub async fn expire(&self, session_id: &str) -> bool {
        self.cache.delete(session_id).await
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }
}

/// 空 / 纯空白的会话 ID 直接拒绝，避免无关请求共享同一个桶
fn session_key(session_id: &str) -> Result<&str, AgentError> {
    if session_id.trim().is_empty() {
        Err(AgentError::EmptySessionKey)
    } else {
        Ok(session_id)
    }
}
