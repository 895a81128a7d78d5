//! 请求 / 响应结构（JSON 字段为 camelCase）

use serde::{Deserialize, Serialize};

use crate::memory::Message;
use crate::tools::SessionMetadata;

/// 时间戳：接受 epoch 整数或任意字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(i64),
    Text(String),
}

/// 渠道上的一条消息；sender 为 "scammer" 或 "user"（诱饵自己）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    pub fn to_memory(&self) -> Message {
        Message::from_sender(&self.sender, self.text.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub session_id: String,
    pub message: ChatMessage,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

impl AnalysisRequest {
    /// 本回合为止的消息数：历史 + 新到的一条
    pub fn turn_count(&self) -> u32 {
        u32::try_from(self.conversation_history.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }
}

/// 统一响应：status 为 "success" 或 "error"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub reply: String,
}

impl AnalysisResponse {
    pub fn success(reply: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            reply: reply.into(),
        }
    }

    pub fn error(reply: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            reply: reply.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
