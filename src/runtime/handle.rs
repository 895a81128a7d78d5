//! 会话级智能体运行时
//!
//! 每个会话一个 AgentRuntime：持有会话元数据、已创建的智能体和对话记忆。
//! 它是租约缓存里的值，驱逐时先释放子资源（对话记忆、各智能体持有的资源），再执行幂等的 teardown。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{Cleanable, Evictable};
use crate::core::AgentError;
use crate::memory::SessionMemory;
use crate::tools::{SessionMetadata, TurnContext};

/// 运行在某个会话运行时上的智能体
#[async_trait]
pub trait SessionAgent: Send + Sync {
    fn name(&self) -> &str;

    /// 处理骗子的一条消息，返回诱饵回复
    async fn initiate(
        &self,
        runtime: &AgentRuntime,
        ctx: &TurnContext,
        query: &str,
    ) -> Result<String, AgentError>;

    /// 释放智能体自身持有的外部资源；运行时被驱逐时调用
    async fn release(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct AgentRuntime {
    session_id: String,
    metadata: RwLock<SessionMetadata>,
    agents: RwLock<HashMap<String, Arc<dyn SessionAgent>>>,
    memory: Arc<SessionMemory>,
    closed: AtomicBool,
}

impl AgentRuntime {
    pub fn new(session_id: impl Into<String>, metadata: SessionMetadata, memory_turns: usize) -> Self {
        Self {
            session_id: session_id.into(),
            metadata: RwLock::new(metadata),
            agents: RwLock::new(HashMap::new()),
            memory: Arc::new(SessionMemory::new(memory_turns)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn memory(&self) -> &Arc<SessionMemory> {
        &self.memory
    }

    pub async fn metadata(&self) -> SessionMetadata {
        self.metadata.read().await.clone()
    }

    /// 租约命中时用本次请求的元数据刷新；请求未带元数据则保留原值
    pub async fn refresh_metadata(&self, metadata: &SessionMetadata) {
        if metadata.is_empty() {
            return;
        }
        *self.metadata.write().await = metadata.clone();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 返回已存在的同名智能体，否则用 factory 创建并登记（幂等）
    pub async fn ensure_agent<F>(&self, name: &str, factory: F) -> Result<Arc<dyn SessionAgent>, AgentError>
    where
        F: FnOnce() -> Arc<dyn SessionAgent>,
    {
        let mut agents = self.agents.write().await;
        if self.is_closed() {
            return Err(AgentError::RuntimeClosed(self.session_id.clone()));
        }
        Ok(Arc::clone(
            agents.entry(name.to_string()).or_insert_with(factory),
        ))
    }

    /// 当前已创建的智能体
    pub async fn agents(&self) -> Vec<Arc<dyn SessionAgent>> {
        self.agents.read().await.values().cloned().collect()
    }

    /// 关闭运行时并丢弃全部智能体；只有第一次调用生效，返回是否由本次关闭
    pub async fn teardown(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let dropped = {
            let mut agents = self.agents.write().await;
            let n = agents.len();
            agents.clear();
            n
        };
        tracing::info!(session_id = %self.session_id, agents = dropped, "Agent runtime torn down");
        true
    }
}

#[async_trait]
impl Cleanable for AgentRuntime {
    async fn cleanup(&self) -> anyhow::Result<()> {
        self.teardown().await;
        Ok(())
    }
}

impl Evictable for Arc<AgentRuntime> {
    fn cleanable(&self) -> Option<&dyn Cleanable> {
        Some(&**self)
    }
}
