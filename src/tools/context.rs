//! 回合上下文：工具需要知道的会话信息，随调用显式传入

use serde::{Deserialize, Serialize};

/// 渠道元数据（可选，用于人设与语言适配）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub channel: Option<String>,
    pub language: Option<String>,
    pub locale: Option<String>,
}

impl SessionMetadata {
    pub fn is_empty(&self) -> bool {
        self.channel.is_none() && self.language.is_none() && self.locale.is_none()
    }

    /// 写入 prompt 的一行描述；无元数据时为 None
    pub fn describe(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("channel", &self.channel),
            ("language", &self.language),
            ("locale", &self.locale),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!("{k}: {v}")))
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// 一次请求回合的上下文
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: String,
    /// 本回合为止的消息数：历史条数 + 新到的一条
    pub message_count: u32,
    pub metadata: SessionMetadata,
}

impl TurnContext {
    pub fn new(session_id: impl Into<String>, message_count: u32, metadata: SessionMetadata) -> Self {
        Self {
            session_id: session_id.into(),
            message_count,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_skips_missing_fields() {
        let meta = SessionMetadata {
            channel: Some("SMS".to_string()),
            language: None,
            locale: Some("IN".to_string()),
        };
        assert_eq!(meta.describe().as_deref(), Some("channel: SMS, locale: IN"));
        assert_eq!(SessionMetadata::default().describe(), None);
        assert!(SessionMetadata::default().is_empty());
    }
}
