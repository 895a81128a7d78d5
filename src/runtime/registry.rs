//! 智能体注册表：agent_type -> 工厂
//!
//! ensure_agent 在会话运行时上幂等地创建智能体；未注册的类型属于配置错误，直接返回 UnknownAgentType。

use std::collections::HashMap;
use std::sync::Arc;

use super::honeypot::create_honeypot_agent;
use super::prompts::HONEYPOT_AGENT_NAME;
use super::{AgentRuntime, SessionAgent};
use crate::core::AgentError;
use crate::intel::IntelStore;
use crate::llm::LlmClient;
use crate::tools::ToolExecutor;

/// 创建智能体所需的共享依赖
#[derive(Clone)]
pub struct AgentToolkit {
    pub llm: Arc<dyn LlmClient>,
    pub executor: Arc<ToolExecutor>,
    pub intel: Arc<IntelStore>,
    /// 单回合内最多的规划步数（含工具调用）
    pub max_steps: usize,
}

pub type AgentFactory = fn(&AgentRuntime, &AgentToolkit) -> Arc<dyn SessionAgent>;

pub struct AgentRegistry {
    factories: HashMap<String, AgentFactory>,
    toolkit: AgentToolkit,
}

impl AgentRegistry {
    pub fn new(toolkit: AgentToolkit) -> Self {
        Self {
            factories: HashMap::new(),
            toolkit,
        }
    }

    /// 预注册 HONEYPOT
    pub fn with_defaults(toolkit: AgentToolkit) -> Self {
        let mut registry = Self::new(toolkit);
        registry.register(HONEYPOT_AGENT_NAME, create_honeypot_agent);
        registry
    }

    pub fn register(&mut self, agent_type: impl Into<String>, factory: AgentFactory) {
        self.factories.insert(agent_type.into(), factory);
    }

    pub fn agent_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub async fn ensure_agent(
        &self,
        agent_type: &str,
        runtime: &AgentRuntime,
    ) -> Result<Arc<dyn SessionAgent>, AgentError> {
        let factory = self
            .factories
            .get(agent_type)
            .copied()
            .ok_or_else(|| AgentError::UnknownAgentType(agent_type.to_string()))?;

        runtime
            .ensure_agent(agent_type, || {
                tracing::debug!(session_id = runtime.session_id(), agent_type, "Creating agent");
                factory(runtime, &self.toolkit)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::CleanupQueue;
    use crate::llm::MockLlmClient;
    use crate::tools::{SessionMetadata, ToolRegistry};

    fn toolkit() -> AgentToolkit {
        AgentToolkit {
            llm: Arc::new(MockLlmClient),
            executor: Arc::new(ToolExecutor::new(ToolRegistry::new(), Duration::from_secs(1))),
            intel: Arc::new(IntelStore::new(10, Duration::from_secs(60), CleanupQueue::spawn(8, 1))),
            max_steps: 3,
        }
    }

    #[tokio::test]
    async fn test_unknown_agent_type_is_fatal() {
        let registry = AgentRegistry::with_defaults(toolkit());
        let runtime = AgentRuntime::new("s1", SessionMetadata::default(), 10);

        let err = registry.ensure_agent("SUPPORT", &runtime).await.err().unwrap();
        assert!(matches!(err, AgentError::UnknownAgentType(ref t) if t == "SUPPORT"));
        assert!(err.to_string().contains("Unknown agent_type 'SUPPORT'"));
    }

    #[tokio::test]
    async fn test_honeypot_is_created_once_per_runtime() {
        let registry = AgentRegistry::with_defaults(toolkit());
        let runtime = AgentRuntime::new("s1", SessionMetadata::default(), 10);

        let a = registry.ensure_agent("HONEYPOT", &runtime).await.unwrap();
        let b = registry.ensure_agent("HONEYPOT", &runtime).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "HONEYPOT");
        assert_eq!(registry.agent_types(), vec!["HONEYPOT".to_string()]);
    }
}
