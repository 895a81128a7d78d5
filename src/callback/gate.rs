//! 上报闸门
//!
//! should_report 只看情报本身，故意忽略 callback_sent：后来挖到的银行账号可以覆盖只有关键词的旧报告。

use std::sync::Arc;

use super::{FinalResultPayload, Reporter};
use crate::intel::{IntelStore, SessionIntel};

/// 已确认诈骗且至少拿到一项关键情报（银行账户 / UPI / 电话 / 链接）
pub fn should_report(intel: &SessionIntel) -> bool {
    intel.scam_detected && intel.has_actionable_intel()
}

/// 判定 + 上报；成功后在情报存储中标记 callback_sent
pub struct CallbackGate {
    intel: Arc<IntelStore>,
    reporter: Arc<dyn Reporter>,
}

impl CallbackGate {
    pub fn new(intel: Arc<IntelStore>, reporter: Arc<dyn Reporter>) -> Self {
        Self { intel, reporter }
    }

    /// 闸门关闭时无副作用返回 false；上报失败只记日志并返回 false，不标记记录，下一次合并时重试
    pub async fn maybe_report(&self, session_id: &str, intel: &SessionIntel) -> bool {
        if !should_report(intel) {
            return false;
        }

        let payload = FinalResultPayload::from_intel(session_id, intel);
        tracing::info!(
            session_id,
            payload = %serde_json::to_string(&payload).unwrap_or_default(),
            "Sending callback"
        );

        match self.reporter.send(&payload).await {
            Ok(()) => {
                if !self.intel.mark_reported(session_id).await {
                    tracing::warn!(session_id, "Callback sent but session intel was already evicted");
                }
                tracing::info!(session_id, "Callback sent successfully");
                true
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Callback failed");
                false
            }
        }
    }
}
