//! 记忆层：单个会话的对话历史（短期记忆），作为智能体运行时的可释放子资源

pub mod conversation;
pub mod session;

pub use conversation::{ConversationMemory, Message, Role};
pub use session::SessionMemory;
