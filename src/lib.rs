//! Honeypot - 对话式诈骗诱饵服务
//!
//! 以天真用户人设与骗子多轮周旋，按会话累积抽取到的情报（银行账户、UPI、钓鱼链接、电话、关键词），
//! 确认诈骗且拿到关键情报后上报外部收集端。
//!
//! 模块划分：
//! - **cache**: TTL + LRU 会话缓存与双路驱逐清理
//! - **core**: 错误类型、清理队列、后台清扫、优雅关闭
//! - **intel**: 会话情报记录、存储与字段规范化
//! - **callback**: 上报闸门与上报通道
//! - **runtime**: 会话级智能体运行时、租约缓存、注册表、HONEYPOT 智能体
//! - **tools**: Tool trait、执行器与 scam_intel
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话记忆
//! - **agent**: 组件构建与单回合处理
//! - **api**: 请求 / 响应结构与 HTTP 路由

pub mod agent;
pub mod api;
pub mod cache;
pub mod callback;
pub mod config;
pub mod core;
pub mod intel;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod runtime;
pub mod tools;

pub use agent::{build_components, process_turn, HoneypotComponents};
pub use config::{load_config, AppConfig};
