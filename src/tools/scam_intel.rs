//! scam_intel：情报抽取工具
//!
//! LLM 在对话中识别出银行账户、UPI、链接、电话或诈骗关键词时调用。
//! 工具把参数合并进会话情报，再交给 CallbackGate 判断是否上报。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, TurnContext};
use crate::callback::CallbackGate;
use crate::intel::{IntelStore, IntelUpdate};

pub const SCAM_INTEL_TOOL: &str = "scam_intel";

const REPORTED: &str = "Intelligence saved and final report sent to central HQ successfully.";
const ACCUMULATED: &str = "Intelligence captured and accumulated.";

/// scam_intel 参数（全部可选）
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScamIntelArgs {
    /// Bank account numbers found (if any).
    pub bank_accounts: Option<Vec<String>>,
    /// UPI IDs found, e.g. name@bank (if any).
    pub upi_ids: Option<Vec<String>>,
    /// Malicious URLs (if any).
    pub phishing_links: Option<Vec<String>>,
    /// Phone numbers extracted (if any).
    pub phone_numbers: Option<Vec<String>>,
    /// Key terms used by the scammer (if any).
    pub suspicious_keywords: Option<Vec<String>>,
    /// Confidence (0-100) that this is a scam.
    pub scam_score: Option<i64>,
}

/// 情报抽取工具
pub struct ScamIntelTool {
    intel: Arc<IntelStore>,
    gate: Arc<CallbackGate>,
    /// scam_score 严格大于该值才视为确认诈骗
    threshold: i64,
}

impl ScamIntelTool {
    pub fn new(intel: Arc<IntelStore>, gate: Arc<CallbackGate>, threshold: i64) -> Self {
        Self {
            intel,
            gate,
            threshold,
        }
    }

    fn to_update(&self, ctx: &TurnContext, args: ScamIntelArgs) -> IntelUpdate {
        let score = args
            .scam_score
            .map_or_else(|| "None".to_string(), |s| s.to_string());

        IntelUpdate {
            bank_accounts: args.bank_accounts.unwrap_or_default(),
            upi_ids: args.upi_ids.unwrap_or_default(),
            phishing_links: args.phishing_links.unwrap_or_default(),
            phone_numbers: args.phone_numbers.unwrap_or_default(),
            suspicious_keywords: args.suspicious_keywords.unwrap_or_default(),
            scam_detected: args.scam_score.is_some_and(|s| s > self.threshold),
            // 加上诱饵本回合即将发出的回复
            message_count: ctx.message_count.saturating_add(1),
            agent_notes: format!("Scam Score: {score}. Auto-extracted via HoneyPot Agent."),
        }
    }
}

#[async_trait]
impl Tool for ScamIntelTool {
    fn name(&self) -> &str {
        SCAM_INTEL_TOOL
    }

    fn description(&self) -> &str {
        "Use this tool if there is any INTEL to save, else do not use it at all. \
         Call it WHENEVER you identify bank accounts, UPI IDs, phishing links, phone numbers \
         or suspicious keywords in the conversation. Do not call it for intel that is already saved. \
         Set scam_score when you can confidently score the scam above 60."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(ScamIntelArgs)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }

    async fn execute(&self, ctx: &TurnContext, args: Value) -> Result<String, String> {
        let args: ScamIntelArgs = if args.is_null() {
            ScamIntelArgs::default()
        } else {
            serde_json::from_value(args).map_err(|e| format!("Invalid scam_intel arguments: {e}"))?
        };
        let update = self.to_update(ctx, args);

        tracing::info!(
            session_id = %ctx.session_id,
            bank_accounts = ?update.bank_accounts,
            upi_ids = ?update.upi_ids,
            phone_numbers = ?update.phone_numbers,
            scam_detected = update.scam_detected,
            "Intel captured"
        );

        let merged = self
            .intel
            .merge(&ctx.session_id, update)
            .await
            .map_err(|e| e.to_string())?;

        if self.gate.maybe_report(&ctx.session_id, &merged).await {
            Ok(REPORTED.to_string())
        } else {
            Ok(ACCUMULATED.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::callback::{CallbackError, FinalResultPayload, Reporter};
    use crate::core::CleanupQueue;
    use crate::tools::SessionMetadata;

    #[derive(Default)]
    struct RecordingReporter {
        sent: Mutex<Vec<FinalResultPayload>>,
    }

    #[async_trait]
    impl Reporter for RecordingReporter {
        async fn send(&self, payload: &FinalResultPayload) -> Result<(), CallbackError> {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn setup() -> (Arc<IntelStore>, Arc<RecordingReporter>, ScamIntelTool) {
        let store = Arc::new(IntelStore::new(10, Duration::from_secs(60), CleanupQueue::spawn(8, 1)));
        let reporter = Arc::new(RecordingReporter::default());
        let gate = Arc::new(CallbackGate::new(Arc::clone(&store), reporter.clone()));
        let tool = ScamIntelTool::new(Arc::clone(&store), gate, 60);
        (store, reporter, tool)
    }

    fn ctx(message_count: u32) -> TurnContext {
        TurnContext::new("sess-1", message_count, SessionMetadata::default())
    }

    #[tokio::test]
    async fn test_low_score_only_accumulates() {
        let (store, reporter, tool) = setup();
        let out = tool
            .execute(
                &ctx(3),
                serde_json::json!({"upi_ids": ["fraud@ybl"], "scam_score": 60}),
            )
            .await
            .unwrap();

        assert_eq!(out, ACCUMULATED);
        assert!(reporter.sent.lock().unwrap().is_empty());

        let intel = store.peek("sess-1").await.unwrap();
        assert!(!intel.scam_detected);
        assert_eq!(intel.message_count, 4);
        assert_eq!(intel.agent_notes, "Scam Score: 60. Auto-extracted via HoneyPot Agent.");
    }

    #[tokio::test]
    async fn test_confident_score_with_intel_reports() {
        let (store, reporter, tool) = setup();
        let out = tool
            .execute(
                &ctx(1),
                serde_json::json!({"bank_accounts": ["1234 5678"], "scam_score": 85, "phone_numbers": null}),
            )
            .await
            .unwrap();

        assert_eq!(out, REPORTED);
        let sent = reporter.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].session_id, "sess-1");
        assert_eq!(sent[0].total_messages_exchanged, 2);
        assert_eq!(sent[0].extracted_intelligence.bank_accounts, vec!["12345678"]);
        drop(sent);
        assert!(store.peek("sess-1").await.unwrap().callback_sent);
    }

    #[tokio::test]
    async fn test_scam_detected_is_sticky() {
        let (store, _reporter, tool) = setup();
        tool.execute(&ctx(1), serde_json::json!({"scam_score": 95})).await.unwrap();
        tool.execute(&ctx(2), serde_json::json!({"suspicious_keywords": ["kyc"]}))
            .await
            .unwrap();

        let intel = store.peek("sess-1").await.unwrap();
        assert!(intel.scam_detected);
        assert_eq!(intel.agent_notes, "Scam Score: None. Auto-extracted via HoneyPot Agent.");
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected() {
        let (_store, _reporter, tool) = setup();
        let err = tool
            .execute(&ctx(1), serde_json::json!({"upi_ids": "not-a-list"}))
            .await
            .unwrap_err();
        assert!(err.starts_with("Invalid scam_intel arguments"));
    }

    #[tokio::test]
    async fn test_parameters_schema_lists_fields() {
        let (_store, _reporter, tool) = setup();
        let schema = tool.parameters_schema();
        assert!(schema["properties"]["upi_ids"].is_object());
        assert!(schema["properties"]["scam_score"].is_object());
    }
}
