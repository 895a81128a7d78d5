//! 上报载荷（与收集端约定的 JSON 结构，camelCase）

use serde::{Deserialize, Serialize};

use crate::intel::{normalize, SessionIntel};

/// 规范化后的情报字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedIntelligence {
    pub bank_accounts: Vec<String>,
    pub upi_ids: Vec<String>,
    pub phishing_links: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub suspicious_keywords: Vec<String>,
}

/// POST 到收集端的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResultPayload {
    pub session_id: String,
    pub scam_detected: bool,
    pub total_messages_exchanged: u32,
    pub extracted_intelligence: ExtractedIntelligence,
    #[serde(default)]
    pub agent_notes: Option<String>,
}

impl FinalResultPayload {
    /// 由会话情报构造载荷，各字段独立规范化
    pub fn from_intel(session_id: &str, intel: &SessionIntel) -> Self {
        Self {
            session_id: session_id.to_string(),
            scam_detected: intel.scam_detected,
            total_messages_exchanged: intel.message_count,
            extracted_intelligence: ExtractedIntelligence {
                bank_accounts: normalize::bank_accounts(&intel.bank_accounts),
                upi_ids: normalize::upi_ids(&intel.upi_ids),
                phishing_links: normalize::phishing_links(&intel.phishing_links),
                phone_numbers: normalize::phone_numbers(&intel.phone_numbers),
                suspicious_keywords: normalize::keywords(&intel.suspicious_keywords),
            },
            agent_notes: Some(intel.agent_notes.clone()),
        }
    }
}
