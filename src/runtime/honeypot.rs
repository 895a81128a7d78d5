//! HONEYPOT 智能体：以天真用户人设与骗子周旋，并在对话中调用 scam_intel 保存情报
//!
//! 每回合：拼 system（人设 + 工具 + 当前情报摘要）-> plan -> 解析输出 ->
//! ToolCall 则执行并写回 Observation，Response 则作为回复返回。步数有上限。
//! 智能体只读取对话记忆；回合结束后由调用方写入实际发出的回复。

use std::sync::Arc;

use async_trait::async_trait;

use super::planner::{parse_llm_output, Planner, PlannerOutput, OBSERVATION_PREFIX};
use super::prompts::{system_prompt, HONEYPOT_AGENT_NAME, JSON_RETRY_PROMPT};
use super::registry::AgentToolkit;
use super::{AgentRuntime, SessionAgent};
use crate::core::AgentError;
use crate::intel::IntelStore;
use crate::memory::Message;
use crate::tools::{tool_call_schema_json, ToolExecutor, TurnContext};

pub struct HoneypotAgent {
    planner: Planner,
    executor: Arc<ToolExecutor>,
    intel: Arc<IntelStore>,
    max_steps: usize,
}

/// HONEYPOT 的注册工厂
pub fn create_honeypot_agent(_runtime: &AgentRuntime, toolkit: &AgentToolkit) -> Arc<dyn SessionAgent> {
    Arc::new(HoneypotAgent {
        planner: Planner::new(Arc::clone(&toolkit.llm)),
        executor: Arc::clone(&toolkit.executor),
        intel: Arc::clone(&toolkit.intel),
        max_steps: toolkit.max_steps.max(1),
    })
}

impl HoneypotAgent {
    async fn build_system_prompt(&self, runtime: &AgentRuntime, ctx: &TurnContext) -> String {
        let summary = self
            .intel
            .peek(&ctx.session_id)
            .await
            .unwrap_or_default()
            .summary();
        let metadata = runtime.metadata().await;

        system_prompt(
            &self.executor.registry().to_schema_json(),
            &tool_call_schema_json(),
            &summary,
            metadata.describe().as_deref(),
        )
    }

    async fn observe(&self, ctx: &TurnContext, tool: &str, args: serde_json::Value) -> String {
        match self.executor.execute(ctx, tool, args).await {
            Ok(result) => result,
            Err(AgentError::HallucinatedTool(name)) => format!(
                "Error: tool '{name}' does not exist. Available tools: {}",
                self.executor.tool_names().join(", ")
            ),
            Err(e) => format!("Error: {e}"),
        }
    }
}

#[async_trait]
impl SessionAgent for HoneypotAgent {
    fn name(&self) -> &str {
        HONEYPOT_AGENT_NAME
    }

    async fn initiate(
        &self,
        runtime: &AgentRuntime,
        ctx: &TurnContext,
        query: &str,
    ) -> Result<String, AgentError> {
        let system = self.build_system_prompt(runtime, ctx).await;

        // 工具往返只写入本回合的草稿，不进入对话记忆
        let mut scratch = runtime.memory().snapshot().await;
        scratch.push(Message::user(query));

        for step in 1..=self.max_steps {
            let output = self.planner.plan_with_system(&scratch, &system).await?;

            match parse_llm_output(&output) {
                Ok(PlannerOutput::Response(reply)) => {
                    let (prompt_tokens, completion_tokens, total_tokens) = self.planner.token_usage();
                    tracing::debug!(
                        session_id = %ctx.session_id,
                        steps = step,
                        prompt_tokens,
                        completion_tokens,
                        total_tokens,
                        "Agent replied"
                    );
                    return Ok(reply);
                }
                Ok(PlannerOutput::ToolCall(call)) => {
                    let observation = self.observe(ctx, &call.tool, call.args).await;
                    scratch.push(Message::assistant(format!(
                        "Tool call: {} | Result: {}",
                        call.tool, observation
                    )));
                    scratch.push(Message::user(format!(
                        "{OBSERVATION_PREFIX} {}: {}",
                        call.tool, observation
                    )));
                }
                Err(e) => {
                    tracing::warn!(session_id = %ctx.session_id, error = %e, "Unparseable agent output, retrying");
                    scratch.push(Message::assistant(output));
                    scratch.push(Message::user(JSON_RETRY_PROMPT));
                }
            }
        }

        Err(AgentError::MaxStepsExceeded(self.max_steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::core::CleanupQueue;
    use crate::llm::{LlmClient, MockLlmClient};
    use crate::tools::{SessionMetadata, ToolRegistry};

    /// 依次返回预设输出，并记录每次收到的 system prompt
    struct Scripted {
        outputs: Mutex<Vec<String>>,
        systems: Mutex<Vec<String>>,
        /// 每次调用收到的非 system 消息数
        seen: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(outputs: &[&str]) -> Self {
            Self {
                outputs: Mutex::new(outputs.iter().rev().map(|s| s.to_string()).collect()),
                systems: Mutex::new(Vec::new()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for Scripted {
        async fn complete(&self, messages: &[Message]) -> Result<String, AgentError> {
            self.systems.lock().unwrap().push(messages[0].content.clone());
            self.seen.lock().unwrap().push(messages.len() - 1);
            self.outputs
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AgentError::LlmError("script exhausted".to_string()))
        }
    }

    fn toolkit(llm: Arc<dyn LlmClient>, max_steps: usize) -> AgentToolkit {
        AgentToolkit {
            llm,
            executor: Arc::new(ToolExecutor::new(ToolRegistry::new(), Duration::from_secs(1))),
            intel: Arc::new(IntelStore::new(10, Duration::from_secs(60), CleanupQueue::spawn(8, 1))),
            max_steps,
        }
    }

    fn ctx() -> TurnContext {
        TurnContext::new("s1", 1, SessionMetadata::default())
    }

    #[tokio::test]
    async fn test_prompt_includes_history_and_query() {
        let llm = Arc::new(Scripted::new(&["who is this"]));
        let runtime = AgentRuntime::new("s1", SessionMetadata::default(), 10);
        runtime.memory().record_turn("hello madam", "hello?").await;
        let agent = create_honeypot_agent(&runtime, &toolkit(llm.clone(), 3));

        let reply = agent.initiate(&runtime, &ctx(), "your account is blocked").await.unwrap();
        assert_eq!(reply, "who is this");
        assert_eq!(llm.seen.lock().unwrap()[0], 3);
        // 记忆由调用方在回合结束后写入
        assert_eq!(runtime.memory().len().await, 2);
    }

    #[tokio::test]
    async fn test_mock_reply() {
        let runtime = AgentRuntime::new("s1", SessionMetadata::default(), 10);
        let agent = create_honeypot_agent(&runtime, &toolkit(Arc::new(MockLlmClient), 3));

        let reply = agent.initiate(&runtime, &ctx(), "hello madam").await.unwrap();
        assert!(reply.contains("Mock Response"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_observed_and_loop_continues() {
        let llm = Arc::new(Scripted::new(&[
            r#"{"tool": "transfer_money", "args": {}}"#,
            "ok sir wat next",
        ]));
        let runtime = AgentRuntime::new("s1", SessionMetadata::default(), 10);
        let agent = create_honeypot_agent(&runtime, &toolkit(llm.clone(), 3));

        let reply = agent.initiate(&runtime, &ctx(), "send otp").await.unwrap();
        assert_eq!(reply, "ok sir wat next");
        // 第二次规划看到了工具往返：user + 工具调用 + Observation
        assert_eq!(llm.seen.lock().unwrap()[1], 3);
        assert_eq!(runtime.memory().len().await, 0);
        assert!(llm.systems.lock().unwrap()[0].contains("### CURRENT EXTRACTED INTELLIGENCE SUMMARY"));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let llm = Arc::new(Scripted::new(&[
            r#"{"tool": "a", "args": {}}"#,
            r#"{"tool": "b", "args": {}}"#,
        ]));
        let runtime = AgentRuntime::new("s1", SessionMetadata::default(), 10);
        let agent = create_honeypot_agent(&runtime, &toolkit(llm, 2));

        assert!(matches!(
            agent.initiate(&runtime, &ctx(), "hi").await,
            Err(AgentError::MaxStepsExceeded(2))
        ));
        assert_eq!(runtime.memory().len().await, 0);
    }
}
