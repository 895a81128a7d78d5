//! Mock LLM 客户端（用于测试与本地联调，无需 API）
//!
//! 模拟诱饵智能体的行为：骗子消息提到 bank / upi 时先发出 scam_intel Tool Call，
//! 拿到 Observation 后再以人设口吻回复。

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Message, Role};
use crate::runtime::OBSERVATION_PREFIX;

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient;

impl MockLlmClient {
    fn tool_call_for(text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        let mentions_bank = lower.contains("bank");
        let mentions_upi = lower.contains("upi");
        if !mentions_bank && !mentions_upi {
            return None;
        }

        let banks: Vec<&str> = if mentions_bank { vec!["MOCK-BANK-456"] } else { vec![] };
        let upis: Vec<&str> = if mentions_upi { vec!["mock@upi"] } else { vec![] };
        let call = serde_json::json!({
            "tool": "scam_intel",
            "args": {
                "bank_accounts": banks,
                "upi_ids": upis,
                "scam_score": 90
            }
        });
        Some(call.to_string())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, AgentError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if !last_user.starts_with(OBSERVATION_PREFIX) {
            if let Some(call) = Self::tool_call_for(last_user) {
                return Ok(call);
            }
        }

        Ok("[Mock Response from HONEYPOT] Analysis complete for turn.".to_string())
    }
}
