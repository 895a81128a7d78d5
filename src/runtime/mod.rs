//! 会话级智能体运行时：租约缓存、智能体注册表与 HONEYPOT 智能体

mod handle;
mod honeypot;
mod lease;
mod planner;
pub mod prompts;
mod registry;

pub use handle::{AgentRuntime, SessionAgent};
pub use honeypot::{create_honeypot_agent, HoneypotAgent};
pub use lease::{AgentLeaseCache, RuntimeTeardownHook};
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall, OBSERVATION_PREFIX};
pub use registry::{AgentFactory, AgentRegistry, AgentToolkit};
