//! 回合处理错误类型
//!
//! 超时与回调失败不在此列：前者由调用方替换为兜底回复，后者只记日志（见 callback::CallbackError）。

use thiserror::Error;

/// 一次对话回合中可能出现的错误（LLM、工具、会话 key 等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Agent gave no final reply within {0} steps")]
    MaxStepsExceeded(usize),

    /// 致命配置错误：未注册的 agent 类型，不重试
    #[error("Unknown agent_type '{0}'. Register it in the agent registry.")]
    UnknownAgentType(String),

    #[error("Session id must not be empty")]
    EmptySessionKey,

    #[error("Agent runtime for session '{0}' has been torn down")]
    RuntimeClosed(String),

    #[error("Agent task failed: {0}")]
    TaskFailed(String),
}
