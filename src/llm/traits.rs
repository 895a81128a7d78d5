//! LLM 客户端抽象
//!
//! 诱饵智能体只需要非流式完成：一次调用拿到完整回复（直接回复或 JSON Tool Call）。

use async_trait::async_trait;

use crate::core::AgentError;
use crate::memory::Message;

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；失败统一为 AgentError::LlmError
    async fn complete(&self, messages: &[Message]) -> Result<String, AgentError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
