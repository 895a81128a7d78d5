//! 回合处理
//!
//! build_components 在启动时一次性构建全部共享组件（情报存储、上报闸门、租约缓存、注册表、清理队列），
//! process_turn 处理一条骗子消息：租用会话运行时 -> 确保智能体 -> 在超时内生成回复。
//! 超时返回随机的人设兜底回复；其它错误统一为 {"status": "error", "reply": "Internal Error: ..."}。

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::api::{AnalysisRequest, AnalysisResponse};
use crate::cache::MaintainedCache;
use crate::callback::{CallbackGate, DisabledReporter, HttpReporter, Reporter};
use crate::config::AppConfig;
use crate::core::{AgentError, CleanupQueue};
use crate::intel::IntelStore;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::runtime::{AgentLeaseCache, AgentRegistry, AgentRuntime, AgentToolkit, SessionAgent};
use crate::tools::{ScamIntelTool, ToolExecutor, ToolRegistry, TurnContext};

const LAST_RESORT_REPLY: &str = "sorry what? can you say that again";

/// 启动时构建、全部请求共享的组件
pub struct HoneypotComponents {
    pub config: AppConfig,
    pub cleanup: CleanupQueue,
    pub intel: Arc<IntelStore>,
    pub gate: Arc<CallbackGate>,
    pub leases: Arc<AgentLeaseCache>,
    pub registry: Arc<AgentRegistry>,
    reply_timeout: Duration,
}

impl HoneypotComponents {
    /// 后台清扫与关闭流程需要维护的缓存
    pub fn maintained_caches(&self) -> Vec<Arc<dyn MaintainedCache>> {
        vec![
            self.intel.cache() as Arc<dyn MaintainedCache>,
            self.leases.cache() as Arc<dyn MaintainedCache>,
        ]
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

/// 按配置选择 LLM：provider = mock 或没有 API Key 时使用 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    if cfg.llm.provider.eq_ignore_ascii_case("mock") {
        tracing::info!("Using Mock LLM");
        return Arc::new(MockLlmClient);
    }

    let api_key = cfg
        .llm
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    match api_key {
        Some(key) => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(
                OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, Some(&key))
                    .with_temperature(cfg.llm.temperature)
                    .with_request_timeout(Duration::from_secs(cfg.llm.request_timeout_secs)),
            )
        }
        None => {
            tracing::warn!("No API key set, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}

/// 按配置构建上报通道
pub fn create_reporter_from_config(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Reporter>> {
    if !cfg.callback.enabled {
        tracing::warn!("Callback reporting disabled");
        return Ok(Arc::new(DisabledReporter));
    }
    let reporter = HttpReporter::new(
        cfg.callback.url.clone(),
        Duration::from_secs(cfg.callback.timeout_secs),
    )?;
    Ok(Arc::new(reporter))
}

/// 从配置构建全部组件；必须在 Tokio 运行时内调用
pub fn build_components(cfg: AppConfig) -> anyhow::Result<HoneypotComponents> {
    let llm = create_llm_from_config(&cfg);
    let reporter = create_reporter_from_config(&cfg)?;
    let components = build_components_with(cfg, llm, reporter);

    let agent_type = &components.config.agent.agent_type;
    let registered = components.registry.agent_types();
    if !registered.contains(agent_type) {
        anyhow::bail!(
            "Unknown agent_type '{}' (registered: {})",
            agent_type,
            registered.join(", ")
        );
    }
    Ok(components)
}

/// 注入 LLM 与上报通道构建组件（测试使用）
pub fn build_components_with(
    cfg: AppConfig,
    llm: Arc<dyn LlmClient>,
    reporter: Arc<dyn Reporter>,
) -> HoneypotComponents {
    let cleanup = CleanupQueue::spawn(cfg.cache.cleanup_queue_capacity, cfg.cache.cleanup_workers);

    let intel = Arc::new(IntelStore::new(
        cfg.cache.intel_max_size,
        cfg.cache.intel_ttl(),
        cleanup.clone(),
    ));
    let gate = Arc::new(CallbackGate::new(Arc::clone(&intel), reporter));
    let leases = Arc::new(AgentLeaseCache::new(
        cfg.cache.lease_max_size,
        cfg.cache.lease_ttl(),
        cleanup.clone(),
        cfg.agent.max_context_turns,
    ));

    let mut tools = ToolRegistry::new();
    tools.register(ScamIntelTool::new(
        Arc::clone(&intel),
        Arc::clone(&gate),
        cfg.agent.scam_score_threshold,
    ));
    let toolkit = AgentToolkit {
        llm,
        executor: Arc::new(ToolExecutor::new(tools, cfg.agent.tool_timeout())),
        intel: Arc::clone(&intel),
        max_steps: cfg.agent.max_steps,
    };
    let registry = Arc::new(AgentRegistry::with_defaults(toolkit));

    HoneypotComponents {
        reply_timeout: cfg.agent.reply_timeout(),
        config: cfg,
        cleanup,
        intel,
        gate,
        leases,
        registry,
    }
}

/// 处理一条骗子消息；永远返回统一结构
pub async fn process_turn(components: &HoneypotComponents, request: AnalysisRequest) -> AnalysisResponse {
    let ctx = TurnContext::new(
        request.session_id.clone(),
        request.turn_count(),
        request.metadata.clone().unwrap_or_default(),
    );

    match run_turn(components, &ctx, &request).await {
        Ok(reply) => AnalysisResponse::success(reply),
        Err(e) => {
            tracing::error!(session_id = %ctx.session_id, error = %e, "Turn failed");
            AnalysisResponse::error(format!("Internal Error: {e}"))
        }
    }
}

async fn run_turn(
    components: &HoneypotComponents,
    ctx: &TurnContext,
    request: &AnalysisRequest,
) -> Result<String, AgentError> {
    let (runtime, agent) = lease_agent(components, ctx).await?;

    let seeded = runtime
        .memory()
        .seed_if_empty(request.conversation_history.iter().map(|m| m.to_memory()))
        .await;
    if seeded {
        tracing::debug!(session_id = %ctx.session_id, "Conversation memory seeded from request history");
    }

    let query = request.message.text.clone();
    let task_ctx = ctx.clone();
    let task_runtime = Arc::clone(&runtime);
    let handle = tokio::spawn(async move { agent.initiate(&task_runtime, &task_ctx, &query).await });

    // 超时后任务继续在后台运行直至结束，这里只是不再等待；它迟到的回复不会进入记忆
    let reply = match tokio::time::timeout(components.reply_timeout, handle).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => return Err(AgentError::TaskFailed(e.to_string())),
        Err(_) => {
            tracing::warn!(
                session_id = %ctx.session_id,
                timeout_secs = components.reply_timeout.as_secs_f64(),
                "Agent timed out, sending fallback reply"
            );
            fallback_reply(&components.config.agent.fallback_replies)
        }
    };

    runtime.memory().record_turn(&request.message.text, &reply).await;
    Ok(reply)
}

/// 租用运行时并确保智能体存在；运行时恰好在两步之间被驱逐时重新租用一次
async fn lease_agent(
    components: &HoneypotComponents,
    ctx: &TurnContext,
) -> Result<(Arc<AgentRuntime>, Arc<dyn SessionAgent>), AgentError> {
    let agent_type = components.config.agent.agent_type.as_str();

    let runtime = components.leases.lease_for(ctx).await?;
    match components.registry.ensure_agent(agent_type, &runtime).await {
        Err(AgentError::RuntimeClosed(_)) => {
            tracing::debug!(session_id = %ctx.session_id, "Leased runtime was evicted, leasing again");
            components.leases.discard(&runtime).await;
            let runtime = components.leases.lease_for(ctx).await?;
            let agent = components.registry.ensure_agent(agent_type, &runtime).await?;
            Ok((runtime, agent))
        }
        other => other.map(|agent| (runtime, agent)),
    }
}

/// 随机选一条人设兜底回复
pub fn fallback_reply(replies: &[String]) -> String {
    replies
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| LAST_RESORT_REPLY.to_string())
}
