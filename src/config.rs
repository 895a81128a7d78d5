//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HONEYPOT__*` 覆盖（双下划线表示嵌套，如 `HONEYPOT__SERVER__PORT=9000`）。
//! 所有字段都有默认值，不提供任何配置文件也能启动。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub cache: CacheSection,
    pub callback: CallbackSection,
    pub agent: AgentSection,
    pub llm: LlmSection,
}

/// [server] 段：监听地址、API Key、路由前缀
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// 请求头 x-api-key 必须与之相等
    pub api_key: String,
    pub api_prefix: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_key: "YOUR_SECRET_API_KEY".to_string(),
            api_prefix: "/api/v1".to_string(),
        }
    }
}

/// [cache] 段：情报存储与智能体租约的容量 / TTL，后台清扫周期，清理队列规模
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub intel_max_size: usize,
    pub intel_ttl_secs: u64,
    pub lease_max_size: usize,
    pub lease_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub cleanup_queue_capacity: usize,
    pub cleanup_workers: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            intel_max_size: 500,
            intel_ttl_secs: 3600,
            lease_max_size: 100,
            lease_ttl_secs: 3600,
            sweep_interval_secs: 180,
            cleanup_queue_capacity: 256,
            cleanup_workers: 4,
        }
    }
}

impl CacheSection {
    pub fn intel_ttl(&self) -> Duration {
        Duration::from_secs(self.intel_ttl_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// [callback] 段：收集端地址与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallbackSection {
    /// 关闭后情报照常累积，但不会发出任何上报
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for CallbackSection {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://hackathon.guvi.in/api/updateHoneyPotFinalResult".to_string(),
            timeout_secs: 5,
        }
    }
}

/// [agent] 段：智能体类型、回复超时、工具循环步数、诈骗阈值、兜底回复
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub agent_type: String,
    pub reply_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub max_steps: usize,
    /// scam_score 严格大于该值才确认诈骗
    pub scam_score_threshold: i64,
    /// 对话记忆保留轮数
    pub max_context_turns: usize,
    /// 智能体超时时随机选用的人设回复
    pub fallback_replies: Vec<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            agent_type: "HONEYPOT".to_string(),
            reply_timeout_secs: 25,
            tool_timeout_secs: 10,
            max_steps: 4,
            scam_score_threshold: 60,
            max_context_turns: 20,
            fallback_replies: default_fallback_replies(),
        }
    }
}

impl AgentSection {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

fn default_fallback_replies() -> Vec<String> {
    [
        "sorry my phone is acting up, can u say that again?",
        "wait im confused, what do i need to do now",
        "hold on my son is calling me, one minute plz",
        "network is very slow here.. which account did u say?",
        "im trying but the app is not opening, what should i do",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai（任意 OpenAI 兼容端点）/ mock（本地联调）
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.8,
            request_timeout_secs: 60,
        }
    }
}

/// 从 config 目录加载配置，环境变量 HONEYPOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HONEYPOT__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default", "default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path.filter(|p| p.exists()) {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HONEYPOT")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = AppConfig::default();
        assert_eq!(config.cache.intel_max_size, 500);
        assert_eq!(config.cache.intel_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache.lease_max_size, 100);
        assert_eq!(config.cache.sweep_interval(), Duration::from_secs(180));
        assert_eq!(config.callback.timeout_secs, 5);
        assert_eq!(config.agent.scam_score_threshold, 60);
        assert_eq!(config.agent.agent_type, "HONEYPOT");
        assert_eq!(config.server.api_prefix, "/api/v1");
        assert!(!config.agent.fallback_replies.is_empty());
    }

    #[test]
    fn test_file_overrides_only_given_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\n\n[cache]\nintel_max_size = 7\n\n[llm]\nprovider = \"mock\""
        )
        .unwrap();

        let config = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.api_key, "YOUR_SECRET_API_KEY");
        assert_eq!(config.cache.intel_max_size, 7);
        assert_eq!(config.cache.lease_max_size, 100);
        assert_eq!(config.llm.provider, "mock");
    }
}
