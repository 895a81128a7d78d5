//! Planner：调用 LLM 并解析输出
//!
//! parse_llm_output 从文本中提取 JSON 并解析为 ToolCall；纯文本视为直接回复骗子。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;

/// 工具结果写回对话时的前缀
pub const OBSERVATION_PREFIX: &str = "Observation from";

/// LLM 返回的 Tool Call：{"tool": "scam_intel", "args": {...}}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum PlannerOutput {
    /// 直接回复
    Response(String),
    ToolCall(ToolCall),
}

/// 解析 LLM 输出
///
/// 明显是 JSON（```json 代码块或以 `{` 开头）但解析失败时返回 JsonParseError，由调用方追加纠错提示重试；
/// 正文中夹带的花括号解析失败则按普通回复处理。
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();

    let (json_str, explicit) = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        (rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()), true)
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start >= end {
            return Ok(PlannerOutput::Response(trimmed.to_string()));
        }
        (&trimmed[start..=end], start == 0)
    } else {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    };

    match serde_json::from_str::<ToolCall>(json_str) {
        Ok(call) if !call.tool.is_empty() => Ok(PlannerOutput::ToolCall(call)),
        Ok(_) => Ok(PlannerOutput::Response(trimmed.to_string())),
        Err(e) if explicit => Err(AgentError::JsonParseError(format!("{e}: {json_str}"))),
        Err(_) => Ok(PlannerOutput::Response(trimmed.to_string())),
    }
}

/// 持有 LLM，plan_with_system 拼 system + messages 后调用
pub struct Planner {
    llm: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn plan_with_system(&self, messages: &[Message], system: &str) -> Result<String, AgentError> {
        let mut full_messages = Vec::with_capacity(messages.len() + 1);
        full_messages.push(Message::system(system));
        full_messages.extend_from_slice(messages);
        self.llm.complete(&full_messages).await
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }
}
