//! 会话记忆：智能体运行时持有的可释放子资源
//!
//! 运行时被驱逐时由清理流程调用 cleanup 清空历史。
//! 一个回合只在结束时整体写入（骗子消息 + 实际发出的回复），失败或超时的智能体输出不会进入记忆。

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ConversationMemory, Message};
use crate::cache::Cleanable;

/// 一个会话的对话历史（并发回合通过 Mutex 串行访问）
pub struct SessionMemory {
    conversation: Mutex<ConversationMemory>,
}

impl SessionMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            conversation: Mutex::new(ConversationMemory::new(max_turns)),
        }
    }

    /// 记忆为空时用请求携带的历史补种（运行时新建或被清空后的第一回合）；返回是否补种
    pub async fn seed_if_empty(&self, history: impl IntoIterator<Item = Message>) -> bool {
        let mut conversation = self.conversation.lock().await;
        if !conversation.is_empty() {
            return false;
        }
        conversation.extend(history);
        !conversation.is_empty()
    }

    /// 写入一个完整回合：骗子的消息与实际发给对方的回复
    pub async fn record_turn(&self, incoming: &str, reply: &str) {
        self.conversation
            .lock()
            .await
            .extend([Message::user(incoming), Message::assistant(reply)]);
    }

    /// 当前历史的快照
    pub async fn snapshot(&self) -> Vec<Message> {
        self.conversation.lock().await.messages().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.conversation.lock().await.len()
    }
}

#[async_trait]
impl Cleanable for SessionMemory {
    async fn cleanup(&self) -> anyhow::Result<()> {
        let dropped = {
            let mut conversation = self.conversation.lock().await;
            let n = conversation.len();
            conversation.clear();
            n
        };
        tracing::debug!(dropped, "Session memory released");
        Ok(())
    }
}
